//! The patch DSL
//!
//! Patch files live in a mod's `patches/` directory and are discovered like
//! library fragments (`patches/haven.xml` patches `library/haven`). They run
//! after every mod has merged, in mod order then file order.

mod engine;
mod instruction;

pub use engine::{
    FileOutcome, InstructionOutcome, PatchSummary, apply_instruction, apply_patch_file,
    apply_patches,
};
pub use instruction::{MathOperator, PatchInstruction, PatchKind, PatchOperation};
