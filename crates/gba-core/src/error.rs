use thiserror::Error;

/// Misuse of the inspection protocol reported to the inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ProtocolError {
    /// The emulation session has been dropped; the command was not queued.
    #[error("emulation session is gone")]
    Disconnected,
    /// A shared framebuffer of the wrong size was supplied.
    #[error("framebuffer holds {actual} bytes, expected {expected}")]
    FramebufferSize {
        /// Required size in bytes (240×160×4).
        expected: usize,
        /// Size of the supplied buffer.
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::ProtocolError;

    #[test]
    fn messages_name_the_sizes() {
        let error = ProtocolError::FramebufferSize {
            expected: 153_600,
            actual: 4,
        };
        assert_eq!(
            error.to_string(),
            "framebuffer holds 4 bytes, expected 153600"
        );
        assert_eq!(
            ProtocolError::Disconnected.to_string(),
            "emulation session is gone"
        );
    }
}
