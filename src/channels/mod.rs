// Legacy channel names, in-place renaming and single-channel reads

pub mod extract;
pub mod mapping;
pub mod normalize;

pub use extract::{load_channel, ExtractedChannel};
pub use mapping::{ChannelMapping, ChannelNameRow};
pub use normalize::{
    normalize_channels, open_fixed, with_fixed_channels, NormalizationReport, RenameOutcome,
    RenameStatus,
};
