//! Interactive correction of the proposed layout.
//!
//! After classification and page-number resolution the pipeline proposes a
//! layout to an outside reviewer and blocks until it is accepted, possibly
//! edited, or cancelled. A cancellation carries a cutoff page index; only
//! pages below it are committed by the later passes.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{BoundingBox, Document, Page, PageBoxes, RegionType, PAGE_NUMBER_ATTRIBUTE};

/// Proposed (or corrected) state of one top-level region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionLayout {
    /// Region type
    #[serde(rename = "type")]
    pub kind: RegionType,
    /// Continuation flag
    #[serde(default, rename = "continue")]
    pub continues: bool,
    /// Box on the region's own page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// Proposed (or corrected) layout of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    /// Page id
    pub page_id: i64,
    /// Resolved page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,
    /// Top-level regions in page order
    pub regions: Vec<RegionLayout>,
}

impl PageLayout {
    /// Snapshot the layout of a page.
    pub fn from_page(page: &Page) -> Self {
        Self {
            page_id: page.id,
            page_number: page
                .attribute(PAGE_NUMBER_ATTRIBUTE)
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v >= 0),
            regions: page
                .regions
                .iter()
                .map(|r| RegionLayout {
                    kind: r.kind.clone(),
                    continues: r.continues,
                    bounding_box: r.bounding_box(),
                })
                .collect(),
        }
    }

    /// Write the layout back onto `page`, region by region index.
    pub fn apply(&self, page: &mut Page) {
        if self.regions.len() != page.regions.len() {
            log::warn!(
                "Layout for page {} has {} regions, page has {}",
                page.id,
                self.regions.len(),
                page.regions.len()
            );
        }
        for (region, layout) in page.regions.iter_mut().zip(&self.regions) {
            region.kind = layout.kind.clone();
            region.continues = layout.continues;
            if let Some(bbox) = layout.bounding_box {
                match region.bounding_boxes.0.first_mut() {
                    Some(slot) => *slot = Some(bbox),
                    None => region.bounding_boxes = PageBoxes::single(bbox),
                }
            }
        }
        if let Some(number) = self.page_number {
            page.set_attribute(PAGE_NUMBER_ATTRIBUTE, number.to_string());
        }
    }
}

/// Layout proposed for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    /// Pages in document order
    pub pages: Vec<PageLayout>,
}

impl CorrectionRequest {
    /// Proposal covering every page of the document.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            pages: doc.pages.iter().map(PageLayout::from_page).collect(),
        }
    }

    /// Apply every page layout to the matching page of `doc`.
    pub fn apply_to(layouts: &[PageLayout], doc: &mut Document) -> Result<()> {
        for layout in layouts {
            let index = doc.page_index(layout.page_id).ok_or_else(|| {
                Error::Correction(format!("layout references unknown page {}", layout.page_id))
            })?;
            layout.apply(&mut doc.pages[index]);
        }
        Ok(())
    }
}

/// Reviewer's answer to a [`CorrectionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CorrectionResponse {
    /// The layout, possibly edited
    Accepted(Vec<PageLayout>),
    /// Review stopped; pages from `cutoff` on stay unprocessed
    Cancelled {
        /// First page index not committed
        cutoff: usize,
    },
}

/// Where correction requests go.
pub trait CorrectionChannel {
    /// Submit the proposal and wait for the answer.
    fn request(&mut self, request: CorrectionRequest) -> CorrectionResponse;
}

/// Accepts every proposal unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CorrectionChannel for AcceptAll {
    fn request(&mut self, request: CorrectionRequest) -> CorrectionResponse {
        CorrectionResponse::Accepted(request.pages)
    }
}

/// Cancels every review at a fixed page index.
#[derive(Debug, Clone, Copy)]
pub struct CancelAt {
    /// First page index not committed
    pub cutoff: usize,
}

impl CancelAt {
    /// Cancel at `cutoff`.
    pub fn new(cutoff: usize) -> Self {
        Self { cutoff }
    }
}

impl CorrectionChannel for CancelAt {
    fn request(&mut self, _request: CorrectionRequest) -> CorrectionResponse {
        CorrectionResponse::Cancelled { cutoff: self.cutoff }
    }
}

/// Pipeline side of a channel pair connecting to a reviewer on another
/// thread.
#[derive(Debug)]
pub struct ChannelCorrector {
    requests: Sender<CorrectionRequest>,
    responses: Receiver<CorrectionResponse>,
}

/// Reviewer side of a channel pair.
#[derive(Debug)]
pub struct CorrectionEndpoint {
    requests: Receiver<CorrectionRequest>,
    responses: Sender<CorrectionResponse>,
}

impl ChannelCorrector {
    /// Create a connected corrector and reviewer endpoint.
    pub fn pair() -> (ChannelCorrector, CorrectionEndpoint) {
        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        (
            ChannelCorrector {
                requests: request_tx,
                responses: response_rx,
            },
            CorrectionEndpoint {
                requests: request_rx,
                responses: response_tx,
            },
        )
    }
}

impl CorrectionChannel for ChannelCorrector {
    fn request(&mut self, request: CorrectionRequest) -> CorrectionResponse {
        if self.requests.send(request).is_err() {
            log::warn!("Correction reviewer disconnected before the request; nothing committed");
            return CorrectionResponse::Cancelled { cutoff: 0 };
        }
        match self.responses.recv() {
            Ok(response) => response,
            Err(_) => {
                log::warn!("Correction reviewer disconnected without answering; nothing committed");
                CorrectionResponse::Cancelled { cutoff: 0 }
            }
        }
    }
}

impl CorrectionEndpoint {
    /// Wait for the next proposal.
    pub fn recv(&self) -> Result<CorrectionRequest> {
        self.requests
            .recv()
            .map_err(|_| Error::Correction("pipeline disconnected".to_string()))
    }

    /// Answer the last proposal.
    pub fn reply(&self, response: CorrectionResponse) -> Result<()> {
        self.responses
            .send(response)
            .map_err(|_| Error::Correction("pipeline disconnected".to_string()))
    }
}
