use std::collections::VecDeque;
use std::io::BufRead;

/// Supplies the logical lines `READ` consumes.
///
/// A line source never fails: running past the end of a file, or hitting EOF on standard
/// input, both yield the empty string, exactly as `READ` expects on exhaustion.
pub trait LineSource {
    fn read_line(&mut self) -> String;
}

/// The two concrete input collaborators the CLI wires up: an entire file read once at
/// startup and drained line by line, or standard input read one line per call.
pub enum Input<R> {
    File(VecDeque<String>),
    Stdin(R),
}

impl<R: BufRead> Input<R> {
    pub fn from_file(contents: &str) -> Input<R> {
        Input::File(contents.lines().map(|l| l.to_string()).collect())
    }

    pub fn from_stdin(reader: R) -> Input<R> {
        Input::Stdin(reader)
    }
}

impl<R: BufRead> LineSource for Input<R> {
    fn read_line(&mut self) -> String {
        match self {
            Input::File(lines) => lines.pop_front().unwrap_or_default(),
            Input::Stdin(reader) => {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => String::new(),
                    Ok(_) => {
                        if line.ends_with('\n') {
                            line.pop();
                            if line.ends_with('\r') {
                                line.pop();
                            }
                        }
                        line
                    }
                }
            }
        }
    }
}
