//! DNA Module
//!
//! Encoding of a full trait selection into one comparable key, and the
//! run-wide set of keys already used.

mod codec;
mod tracker;

pub use codec::{
    clean_dna, construct_layer_to_dna, encode_decoded, filter_dna_options, remove_query_strings,
    DecodedLayer, DnaEntry, DnaStrand, BYPASS_OPTION, DNA_DELIMITER, ID_SEPARATOR,
    OPTION_SEPARATOR,
};
pub use tracker::UniquenessTracker;
