pub mod assembler;
pub mod batch;
pub mod errors;
pub mod extractor;
pub mod history;
pub mod markup;

pub use assembler::{assemble, ContentType, RenderedDocument, RenderedSection};
pub use batch::{
    generate_batch, BatchOptions, GeneratedItem, GenerationRequest, GeneratorError, TextGenerator,
};
pub use errors::ContentError;
pub use extractor::{extract_sections, Segment, Segmentation};
pub use history::{HistoryEntry, HistoryStore, HistoryStoreError};
pub use markup::{classify_shape, escape_html, translate_segment, FormattedBlock, Shape};
