mod campaign;
mod conversion;

pub use campaign::{CampaignMapping, CreateCampaignMapping, UpdateCampaignMapping};
pub use conversion::{Conversion, ConversionFilters, ConversionSummary, CreateConversion};
