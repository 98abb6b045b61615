use anyhow::Result;
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Moves backwards in a file to the beginning of the line that ends at the current position.
/// The byte right before the current position is ignored, so a trailing `\n` belongs to the line
/// being sought.
pub async fn seek_line_backwards(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    buffer: &mut [u8],
) -> Result<(), io::Error> {
    let mut need_to_skip = 1usize;
    loop {
        let leftover = file.stream_position().await?;
        if leftover == 0 {
            return Ok(());
        }
        let next_chunk = u64::min(leftover, buffer.len() as u64) as usize;
        file.seek(std::io::SeekFrom::Current(-(next_chunk as i64)))
            .await?;

        file.read_exact(&mut buffer[..next_chunk]).await?;
        let newline = buffer[..next_chunk]
            .iter()
            .rev()
            .enumerate()
            .skip(need_to_skip)
            .find(|(_, value)| **value == b'\n')
            .map(|(index, _)| index);

        if let Some(index) = newline {
            file.seek(std::io::SeekFrom::Current(-(index as i64)))
                .await?;
            return Ok(());
        }

        need_to_skip = need_to_skip.saturating_sub(next_chunk);
        file.seek(std::io::SeekFrom::Current(-(next_chunk as i64)))
            .await?;
    }
}

/// Reads the final line of a file, without its line terminator. Empty for an empty file.
pub async fn read_last_line(file: &mut (impl AsyncSeek + AsyncRead + Unpin)) -> Result<String> {
    file.seek(std::io::SeekFrom::End(0)).await?;
    seek_line_backwards(file, &mut vec![0; 1024]).await?;
    let mut last_line = String::new();
    file.read_to_string(&mut last_line).await?;
    Ok(last_line.trim_end_matches(['\r', '\n']).to_string())
}

/// Whether the file is empty or its last byte terminates a line. Appending to a file that fails
/// this check would glue the new row onto a torn one.
pub async fn ends_with_newline(file: &mut (impl AsyncSeek + AsyncRead + Unpin)) -> Result<bool> {
    let len = file.seek(std::io::SeekFrom::End(0)).await?;
    if len == 0 {
        return Ok(true);
    }
    file.seek(std::io::SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}
