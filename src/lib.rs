pub mod api;
pub mod boxes;
pub mod known_boxes;
pub mod parser;
pub mod registry;
pub mod samples;
pub mod util;

pub use api::{Mp4File, Track};
pub use boxes::{BoxBody, BoxHeader, FourCC, FullBoxHeader, Mp4Box, find_boxes};
pub use known_boxes::KnownBox;
pub use parser::{ParseError, ParseOptions, Result, parse_box, parse_children, read_box_header};
pub use samples::{SampleLocation, SampleTable};
pub use util::{FixedPoint, Value, ValueMode, read_value};
