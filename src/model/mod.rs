//! Annotation model the structure passes operate on.
//!
//! Pages own their words exclusively; regions and annotations are spans over
//! word indices of the page they live on. Structure passes mutate pages in
//! place and move content between pages explicitly, never by aliasing.

mod document;
mod page;
mod region;
mod table;
mod word;

pub use document::{Document, Metadata, PAGE_NUMBER_ATTRIBUTE};
pub use page::{FontStatistics, Page, RangeMove, SpanBuffer, DEFAULT_DPI};
pub use region::{Annotation, Region, RegionType};
pub use table::{Table, TableCell, TableRow};
pub use word::{Attributes, BoundingBox, PageBoxes, Word};
