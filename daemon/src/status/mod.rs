mod assembler;
mod baseline;
mod map_resolver;
mod notifier;

pub use assembler::{ServerStatusAssembler, StatusSource};
pub use baseline::Baseline;
pub use map_resolver::{ChainMapResolver, HttpMapResolver, LabelMapResolver, MapResolver};
pub use notifier::ChangeDetectingNotifier;
