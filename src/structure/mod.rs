//! Structure recovery passes over the annotation model.
//!
//! Each pass mutates pages in place:
//! - [`classifier`] assigns initial paragraph types
//! - [`page_numbers`] resolves printed page numbers
//! - [`stitcher`] merges blocks split across page boundaries
//! - [`table_builder`] turns table regions into row/cell grids

pub mod classifier;
pub mod interval;
pub mod page_numbers;
pub mod stitcher;
pub mod table_builder;

pub use classifier::{ClassifierConfig, Orientation, ParagraphClass, ParagraphClassifier, ParagraphView};
pub use interval::Interval;
pub use page_numbers::{
    Candidate, DigitConfusion, Hypothesis, PageNumberConfig, PageNumberResolver, PageValue,
    UNKNOWN,
};
pub use stitcher::{Orphan, RegionStitcher, RestoreRule, StitchConfig, StitchReport};
pub use table_builder::{Axis, Grid, GridCell, GridRow, TableBuilder, TableConfig, TablePass};

use crate::model::Region;

/// Path from a page's top-level regions down to a nested region.
pub type RegionPath = Vec<usize>;

/// Region at `path`, if every index exists.
pub(crate) fn region_at<'a>(regions: &'a [Region], path: &[usize]) -> Option<&'a Region> {
    let (first, rest) = path.split_first()?;
    let mut region = regions.get(*first)?;
    for &index in rest {
        region = region.children.get(index)?;
    }
    Some(region)
}

/// Mutable region at `path`, if every index exists.
pub(crate) fn region_at_mut<'a>(regions: &'a mut [Region], path: &[usize]) -> Option<&'a mut Region> {
    let (first, rest) = path.split_first()?;
    let mut region = regions.get_mut(*first)?;
    for &index in rest {
        region = region.children.get_mut(index)?;
    }
    Some(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegionType;

    #[test]
    fn test_region_path_lookup() {
        let mut regions = vec![Region::new(RegionType::Table, 0, 4)
            .with_child(Region::new(RegionType::Paragraph, 0, 2))
            .with_child(Region::new(RegionType::Paragraph, 2, 4))];

        assert_eq!(region_at(&regions, &[0, 1]).map(|r| r.start), Some(2));
        assert!(region_at(&regions, &[0, 2]).is_none());
        assert!(region_at(&regions, &[]).is_none());

        if let Some(region) = region_at_mut(&mut regions, &[0, 0]) {
            region.kind = RegionType::MainText;
        }
        assert_eq!(regions[0].children[0].kind, RegionType::MainText);
    }
}
