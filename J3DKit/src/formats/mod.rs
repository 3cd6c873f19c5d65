//! Building blocks shared by the animation and archive codecs

pub mod common;
