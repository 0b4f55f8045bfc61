use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serialises the status line and headers for a body of `content_length`
/// bytes.
pub fn header_block(status: StatusCode, content_type: &str, content_length: usize) -> String {
    format!(
        "{} {} {}\r\nCache-Control: no-cache\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase(),
        content_type,
        content_length
    )
}

/// Writes one response and then releases it.
pub struct ResponseWriter {
    response: Response,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            written: 0,
        }
    }

    /// Writes every byte, then runs the release hook.
    ///
    /// The hook runs after the last write returns, whether or not the write
    /// succeeded, and never earlier.
    pub async fn write_to_stream<W>(mut self, stream: &mut W) -> anyhow::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let result = self.write_all(stream).await;
        let written = self.written;
        self.response.release();
        result.map(|()| written)
    }

    async fn write_all<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let data = self.response.as_bytes();
        while self.written < data.len() {
            let n = stream.write(&data[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }
        stream.flush().await?;

        Ok(())
    }
}
