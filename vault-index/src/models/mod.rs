mod note_record;
mod search_hit;

pub use note_record::{
    decode_list, encode_list, split_stored, NoteRecord, HEADING_SEPARATOR, LIST_SEPARATOR,
};
pub use search_hit::SearchHit;
pub(crate) use search_hit::sort_hits;
