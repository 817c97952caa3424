//! Metadata Assembler
//!
//! Builds the JSON record for each accepted edition. The target network picks
//! the record shape; the underlying data is the same.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::config::{Creator, GeneratorConfig, Network, SolanaMetadataConfig};

/// Value of the `compiler` field of generic records.
pub const COMPILER: &str = "Strata Art Engine";

/// One `layer -> selected trait` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

impl Attribute {
    pub fn new(trait_type: &str, value: &str) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.to_string(),
        }
    }
}

/// SHA-256 hex digest of an encoded DNA.
pub fn dna_fingerprint(dna: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(dna.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Record for generic (ERC-721 style) collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub dna: String,
    pub edition: u32,
    /// Milliseconds since the Unix epoch
    pub date: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub attributes: Vec<Attribute>,
    pub compiler: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolanaFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolanaProperties {
    pub files: Vec<SolanaFile>,
    pub category: String,
    pub creators: Vec<Creator>,
}

/// Record in the Solana token-metadata shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolanaMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub seller_fee_basis_points: u32,
    pub image: String,
    pub external_url: String,
    pub edition: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub attributes: Vec<Attribute>,
    pub properties: SolanaProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditionMetadata {
    Solana(SolanaMetadata),
    Generic(GenericMetadata),
}

impl EditionMetadata {
    pub fn edition(&self) -> u32 {
        match self {
            EditionMetadata::Generic(m) => m.edition,
            EditionMetadata::Solana(m) => m.edition,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EditionMetadata::Generic(m) => &m.name,
            EditionMetadata::Solana(m) => &m.name,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            EditionMetadata::Generic(m) => &m.attributes,
            EditionMetadata::Solana(m) => &m.attributes,
        }
    }
}

/// Collection-level fields shared by every record of a run.
#[derive(Debug, Clone)]
pub struct MetadataAssembler {
    network: Network,
    name_prefix: String,
    description: String,
    base_uri: String,
    solana: SolanaMetadataConfig,
    extra: Map<String, Value>,
}

impl MetadataAssembler {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            network: config.network,
            name_prefix: config.name_prefix.clone(),
            description: config.description.clone(),
            base_uri: config.base_uri.clone(),
            solana: config.solana_metadata.clone(),
            extra: config.extra_metadata.clone(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn assemble(&self, edition: u32, dna: &str, attributes: Vec<Attribute>) -> EditionMetadata {
        let name = format!("{} #{}", self.name_prefix, edition);
        match self.network {
            Network::Eth => EditionMetadata::Generic(GenericMetadata {
                name,
                description: self.description.clone(),
                image: format!("{}/{}.png", self.base_uri, edition),
                dna: dna_fingerprint(dna),
                edition,
                date: Utc::now().timestamp_millis(),
                extra: self.extra.clone(),
                attributes,
                compiler: COMPILER.to_string(),
            }),
            Network::Sol => {
                let image = format!("{}.png", edition);
                EditionMetadata::Solana(SolanaMetadata {
                    name,
                    symbol: self.solana.symbol.clone(),
                    description: self.description.clone(),
                    seller_fee_basis_points: self.solana.seller_fee_basis_points,
                    image: image.clone(),
                    external_url: self.solana.external_url.clone(),
                    edition,
                    extra: self.extra.clone(),
                    attributes,
                    properties: SolanaProperties {
                        files: vec![SolanaFile {
                            uri: image,
                            file_type: "image/png".to_string(),
                        }],
                        category: "image".to_string(),
                        creators: self.solana.creators.clone(),
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(network: Network) -> GeneratorConfig {
        let mut config = GeneratorConfig {
            network,
            name_prefix: "Test".to_string(),
            base_uri: "ipfs://cid".to_string(),
            ..Default::default()
        };
        config
            .extra_metadata
            .insert("creator".to_string(), Value::from("Strata"));
        config
    }

    fn attributes() -> Vec<Attribute> {
        vec![Attribute::new("Background", "Black"), Attribute::new("Eyes", "Red")]
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            dna_fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(dna_fingerprint("0:a.png"), dna_fingerprint("1:a.png"));
    }

    #[test]
    fn test_generic_record() {
        let assembler = MetadataAssembler::from_config(&config(Network::Eth));
        let record = assembler.assemble(7, "0:Black.png-1:Red.png", attributes());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Test #7");
        assert_eq!(json["image"], "ipfs://cid/7.png");
        assert_eq!(json["edition"], 7);
        assert_eq!(json["creator"], "Strata");
        assert_eq!(json["compiler"], COMPILER);
        assert_eq!(json["dna"], dna_fingerprint("0:Black.png-1:Red.png"));
        assert_eq!(json["attributes"][1]["trait_type"], "Eyes");
        assert!(json["date"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_solana_record() {
        let mut config = config(Network::Sol);
        config.solana_metadata.creators = vec![Creator {
            address: "7fXNuer5sbZtaTEPhtJ5g5gNtuyRoKkvxdjEjEnPN4mC".to_string(),
            share: 100,
        }];
        let record = MetadataAssembler::from_config(&config).assemble(0, "0:Black.png", attributes());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["image"], "0.png");
        assert_eq!(json["symbol"], "YC");
        assert_eq!(json["properties"]["files"][0]["type"], "image/png");
        assert_eq!(json["properties"]["category"], "image");
        assert_eq!(json["properties"]["creators"][0]["share"], 100);
        assert!(json.get("dna").is_none());
        assert_eq!(record.edition(), 0);
    }

    #[test]
    fn test_records_read_back() {
        let record = MetadataAssembler::from_config(&config(Network::Eth)).assemble(1, "0:a.png", attributes());
        let text = serde_json::to_string_pretty(&record).unwrap();
        let parsed: EditionMetadata = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.attributes(), record.attributes());
        assert_eq!(parsed.name(), "Test #1");
    }
}
