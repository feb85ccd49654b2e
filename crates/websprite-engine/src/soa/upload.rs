/// Receiver of a buffer's raw bytes, typically a GPU vertex buffer.
///
/// Implementations get the complete region (`bytes.len()` is the total byte
/// length) and must not assume it stays valid after the call: the next `grow`
/// reallocates it.
pub trait UploadSink {
    fn upload(&mut self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// CPU-side staging copy. Useful for headless runs and tests.
impl UploadSink for Vec<u8> {
    fn upload(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.clear();
        self.extend_from_slice(bytes);
        Ok(())
    }
}
