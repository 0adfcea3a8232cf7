//! Child process helpers shared by the shipwright crates: a bounded line
//! reader for newline-framed streams, and pipe spawning that merges a child's
//! stdout and stderr into one line stream while keeping the exit status
//! available afterwards.

pub mod pipe;
pub mod status;
pub mod stream;

pub use pipe::{
    DEFAULT_MAX_LINE_BYTES, LineStreamProcess, OutputLine, OutputSource, PipeSpawnOptions,
    spawn_line_stream,
};
pub use status::CommandStatus;
pub use stream::{DecodedLine, LineReader, ReadLineResult, decode_line, read_line_with_limit};
