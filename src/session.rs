use std::time::Duration;

use async_std::{
    future::pending,
    io::{self, prelude::*, BufRead, Write},
};
use tracing::{debug, info, warn};

use crate::{
    deadline::DeadlineGuard,
    error::Error,
    index::{LineTable, TERMINATOR},
    Result, Storage,
};

pub const PROMPT: &str = "Enter the line number: ";
const INPUT_ERROR: &str = "Input error. Please try again.\n";
const INVALID_INPUT: &str = "Invalid input. Please enter only numbers (0-9).\n";
const RULE: &str = "==========================================";

/// Longest accepted answer, terminator excluded. Longer input is discarded and rejected.
pub const MAX_INPUT_LEN: usize = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No valid answer yet, the deadline is running
    AwaitingFirstInput,
    AwaitingInput,
    Terminated,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user asked to quit or the input was closed
    Finished,
    /// Nobody answered in time and the whole file was printed instead
    TimedOut,
}

/// An interactive session printing lines of a single indexed source by their number.
///
/// The session owns the line table and the storage. Both are released when `run` returns, no
/// matter how the session ended.
#[derive(Debug)]
pub struct Session<S: Storage> {
    name: String,
    table: LineTable,
    storage: S,
    guard: DeadlineGuard,
    state: State,
}

impl<S: Storage> Session<S> {
    /// Create a new session over `storage`. `table` must be built from the same data. `deadline`
    /// is the time granted for the first valid answer.
    pub fn new<N: Into<String>>(name: N, table: LineTable, storage: S, deadline: Duration) -> Self {
        // Nothing to dump for empty sources, so no need for a deadline either
        let state = if table.is_empty() {
            State::AwaitingInput
        } else {
            State::AwaitingFirstInput
        };

        Self {
            name: name.into(),
            table,
            storage,
            guard: DeadlineGuard::new(deadline),
            state,
        }
    }

    #[cfg(test)]
    fn state(&self) -> State {
        self.state
    }

    #[cfg(test)]
    fn table(&self) -> &LineTable {
        &self.table
    }

    /// Run the read-eval loop, reading line numbers from `input` and writing everything into
    /// `output` until the user enters `0`, the input ends after a valid answer or the deadline
    /// expires.
    ///
    /// Errors are only returned if writing to `output` fails.
    pub async fn run<R, W>(mut self, input: &mut R, output: &mut W) -> Result<Outcome>
    where
        R: BufRead + Unpin,
        W: Write + Unpin + Send,
    {
        if self.state == State::AwaitingFirstInput {
            self.guard.arm();
        }

        self.write_header(output).await?;

        let mut line = Vec::new();
        let mut input_closed = false;

        while self.state != State::Terminated {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            line.clear();
            let read = self
                .guard
                .watch(next_line(input, &mut line, input_closed))
                .await;
            let read = match read {
                Some(read) => read,
                None => return Ok(self.expire(output).await),
            };

            match read {
                Ok(0) => {
                    debug!("input closed");
                    input_closed = true;
                    output.write_all(INPUT_ERROR.as_bytes()).await?;

                    // Only the deadline can end the wait for a first answer
                    if self.state == State::AwaitingFirstInput {
                        self.guard.arm();
                    } else {
                        self.state = State::Terminated;
                    }
                    continue;
                }
                Err(err) => {
                    warn!(%err, "failed reading input");
                    output.write_all(INPUT_ERROR.as_bytes()).await?;
                    self.rearm();
                    continue;
                }
                Ok(_) => {}
            }

            let number = match parse_line_number(&line) {
                Ok(number) => number,
                Err(err) => {
                    debug!(%err, "rejected input");
                    output.write_all(INVALID_INPUT.as_bytes()).await?;
                    self.rearm();
                    continue;
                }
            };

            if self.state == State::AwaitingFirstInput {
                self.guard.disarm();
                self.state = State::AwaitingInput;
            }

            if number == 0 {
                self.state = State::Terminated;
                break;
            }

            self.show_line(number, output).await?;
        }

        output.flush().await?;
        info!(source = %self.name, "session finished");
        Ok(Outcome::Finished)
    }

    async fn write_header<W: Write + Unpin>(&self, output: &mut W) -> Result<()> {
        let mut header = format!(
            "File '{}' opened ({} bytes)\n\nLine Table (for debugging):\n{}\n",
            self.name,
            self.storage.size(),
            self.table.display()
        );

        if self.guard.is_armed() {
            header.push_str(&format!(
                "You have {:?} to enter a line number. If no input, entire file will be printed.\n",
                self.guard.duration()
            ));
        }

        output.write_all(header.as_bytes()).await?;
        Ok(())
    }

    async fn show_line<W: Write + Unpin>(&mut self, number: u64, output: &mut W) -> Result<()> {
        let entry = match self.table.line(number) {
            Ok(entry) => entry,
            Err(_) => {
                let lines = self.table.len();
                let unit = if lines == 1 { "line" } else { "lines" };
                let msg = format!("The file contains only {} {}.\n", lines, unit);
                output.write_all(msg.as_bytes()).await?;
                return Ok(());
            }
        };

        let mut buf = Vec::new();
        match self
            .storage
            .read_range(entry.offset, entry.length, &mut buf)
            .await
        {
            Ok(_) => {
                output
                    .write_all(format!("Line {}: ", number).as_bytes())
                    .await?;
                output.write_all(&buf).await?;
                output.write_all(b"\n").await?;
            }
            Err(err) => {
                warn!(line = number, %err, "failed reading line");
                let msg = format!("Error reading line {}: {}\n", number, err);
                output.write_all(msg.as_bytes()).await?;
            }
        }

        Ok(())
    }

    /// Restarts the deadline if no valid answer has been given yet
    #[inline]
    fn rearm(&mut self) {
        if self.state == State::AwaitingFirstInput {
            self.guard.arm();
        }
    }

    /// Dump the whole source and end the session. Output errors are ignored, the session ends
    /// either way.
    async fn expire<W: Write + Unpin + Send>(mut self, output: &mut W) -> Outcome {
        debug_assert!(self.guard.has_fired());
        self.state = State::Terminated;

        if let Err(err) = self.dump(output).await {
            warn!(%err, "failed dumping file after deadline");
        }

        info!(source = %self.name, "session timed out");
        Outcome::TimedOut
    }

    async fn dump<W: Write + Unpin + Send>(&mut self, output: &mut W) -> Result<()> {
        let banner = format!(
            "\nTimeout! {:?} elapsed. Printing entire file:\n{}\n",
            self.guard.duration(),
            RULE
        );
        output.write_all(banner.as_bytes()).await?;

        self.storage.write_to(output).await?;

        let footer = format!("\n{}\nProgram finished due to timeout.\n", RULE);
        output.write_all(footer.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}

/// Reads the next line of input. Once the input is closed this never resolves, leaving it up to
/// the deadline to end the wait.
async fn next_line<R: BufRead + Unpin>(
    input: &mut R,
    buf: &mut Vec<u8>,
    closed: bool,
) -> io::Result<usize> {
    if closed {
        return pending().await;
    }

    let limit = MAX_INPUT_LEN as u64 + 1;
    let n = (&mut *input).take(limit).read_until(TERMINATOR, buf).await?;

    if n as u64 == limit && buf.last() != Some(&TERMINATOR) {
        // Skip the rest of the overlong line, `buf` already holds enough to reject it
        let mut rest = Vec::new();
        loop {
            rest.clear();
            let m = (&mut *input).take(limit).read_until(TERMINATOR, &mut rest).await?;
            if m == 0 || rest.last() == Some(&TERMINATOR) {
                break;
            }
        }
    }

    Ok(n)
}

/// Parses a line number typed by a user. Only up to `MAX_INPUT_LEN` decimal digits are
/// accepted, the trailing terminator is ignored. Numbers too large for `u64` saturate, since no table has that many
/// lines anyway.
pub fn parse_line_number(input: &[u8]) -> Result<u64> {
    let digits = input.strip_suffix(&[TERMINATOR]).unwrap_or(input);

    let valid = !digits.is_empty()
        && digits.len() <= MAX_INPUT_LEN
        && digits.iter().all(u8::is_ascii_digit);

    if !valid {
        return Err(Error::Validation(
            String::from_utf8_lossy(digits).into_owned(),
        ));
    }

    let number = digits
        .iter()
        .try_fold(0u64, |acc, d| {
            acc.checked_mul(10)?.checked_add(u64::from(d - b'0'))
        })
        .unwrap_or(u64::MAX);

    Ok(number)
}
