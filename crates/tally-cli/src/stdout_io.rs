use std::io::{self, Write};

pub fn write_stdout_text(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write_text(&mut stdout, text)
}

pub fn write_stdout_line(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write_line(&mut stdout, text)
}

/// Writes `text` and flushes; a closed downstream pipe is not an error.
pub fn write_text(writer: &mut dyn Write, text: &str) -> io::Result<()> {
    write_with_broken_pipe_tolerance(writer, text.as_bytes())?;
    flush_with_broken_pipe_tolerance(writer)
}

pub fn write_line(writer: &mut dyn Write, text: &str) -> io::Result<()> {
    write_with_broken_pipe_tolerance(writer, text.as_bytes())?;
    write_with_broken_pipe_tolerance(writer, b"\n")?;
    flush_with_broken_pipe_tolerance(writer)
}

fn write_with_broken_pipe_tolerance(writer: &mut dyn Write, bytes: &[u8]) -> io::Result<()> {
    match writer.write_all(bytes) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(error) => Err(error),
    }
}

fn flush_with_broken_pipe_tolerance(writer: &mut dyn Write) -> io::Result<()> {
    match writer.flush() {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(error) => Err(error),
    }
}
