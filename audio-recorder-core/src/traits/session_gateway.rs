use crate::models::audio_models::{DeviceDescriptor, Orientation, SessionCategory, SessionMode, SessionOptions};
use crate::models::error::SessionError;

/// Platform audio session: category/mode activation and input selection.
pub trait SessionGateway: Send {
    /// Configure and activate the shared audio session.
    fn activate(
        &mut self,
        category: SessionCategory,
        mode: SessionMode,
        options: SessionOptions,
    ) -> Result<(), SessionError>;

    /// Choose the built-in microphone and data source that suit `orientation`.
    fn select_input(&mut self, orientation: Orientation) -> Result<DeviceDescriptor, SessionError>;
}

/// Gateway for hosts without a session concept. Always succeeds with a mono built-in mic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSessionGateway;

impl SessionGateway for NullSessionGateway {
    fn activate(&mut self, _: SessionCategory, _: SessionMode, _: SessionOptions) -> Result<(), SessionError> {
        Ok(())
    }

    fn select_input(&mut self, orientation: Orientation) -> Result<DeviceDescriptor, SessionError> {
        Ok(DeviceDescriptor {
            id: "default".into(),
            name: "Built-In Microphone".into(),
            data_source: orientation.preferred_data_source(),
            supports_stereo: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::DataSource;

    #[test]
    fn null_gateway_follows_orientation() {
        let mut gateway = NullSessionGateway;
        let device = gateway.select_input(Orientation::LandscapeRight).unwrap();
        assert_eq!(device.data_source, DataSource::Back);
        assert!(!device.supports_stereo);
    }
}
