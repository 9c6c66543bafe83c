//! Small ambient utilities kept from the teacher's own `shared/` tree;
//! only the pieces this crate still has a use for survive (see
//! DESIGN.md for what was dropped).

pub mod rand;
