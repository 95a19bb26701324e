mod assembler;

pub use assembler::{Step, TranscriptAssembler, TranscriptParts};
