pub mod answer_sink;
pub mod query_source;

pub use answer_sink::{AnswerRecord, AnswerSink};
pub use query_source::QuerySource;
