//! Edition Orchestrator
//!
//! Drives DNA generation, the uniqueness check, rendering and persistence for
//! every wave of a run. One edition at a time moves through
//!
//! ```text
//! Generating -> CheckingUnique -> Accepted -> Rendering -> Persisting -> NextEdition
//!                              \-> Rejected -> Generating | Abort
//! ```
//!
//! Rejections (duplicate DNA, unsatisfiable constraint, unloadable asset)
//! share one failure counter for the whole run. Once it reaches the
//! configured tolerance the run aborts.

use image::RgbaImage;
use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::supply::EditionSupply;
use crate::catalog::{layers_setup, Layer};
use crate::config::{GeneratorConfig, DEFAULT_MAX_RESAMPLE_ATTEMPTS, DEFAULT_UNIQUE_DNA_TOLERANCE};
use crate::dna::{construct_layer_to_dna, DecodedLayer, UniquenessTracker};
use crate::error::{Result, StrataError};
use crate::metadata::{dna_fingerprint, EditionMetadata, MetadataAssembler};
use crate::render::{AssetResolver, RenderedEdition, Renderer};
use crate::rules::RuleTable;
use crate::selector::{create_dna, GeneratedDna, WeightedSelector};

/// One generation batch: its layers and the cumulative edition count it
/// grows the collection to.
#[derive(Debug, Clone)]
pub struct Wave {
    pub grow_edition_size_to: u32,
    pub layers: Vec<Layer>,
}

impl Wave {
    /// Distinct DNAs reachable without any rule table; bypassed layers do
    /// not count.
    pub fn combinations(&self) -> u128 {
        self.layers
            .iter()
            .filter(|layer| !layer.bypass_dna)
            .map(|layer| layer.elements.len() as u128)
            .fold(1u128, |acc, n| acc.saturating_mul(n))
    }
}

/// Scan the catalog for every configured wave.
pub fn load_waves(config: &GeneratorConfig) -> Result<Vec<Wave>> {
    config
        .layer_configurations
        .iter()
        .map(|wave| {
            Ok(Wave {
                grow_edition_size_to: wave.grow_edition_size_to,
                layers: layers_setup(&wave.layers_order, &config.layers_dir, &config.rarity_delimiter)?,
            })
        })
        .collect()
}

/// A finished edition, handed to the sink exactly once.
#[derive(Debug, Clone)]
pub struct Edition {
    pub number: u32,
    /// Full encoded DNA, bypass markers included
    pub dna: String,
    /// Rule profile the DNA was generated under
    pub profile: Option<String>,
    pub image: RgbaImage,
    pub frames: Vec<RgbaImage>,
    pub metadata: EditionMetadata,
}

/// Destination for accepted editions.
pub trait EditionSink {
    fn persist(&mut self, edition: &Edition) -> Result<()>;

    /// Called once when the run ends, including when it aborts.
    fn finish(&mut self) -> Result<()>;
}

/// Why an edition attempt was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Duplicate,
    Unsatisfiable,
    AssetLoad,
}

/// Where the current edition attempt is.
#[derive(Debug, Clone)]
pub enum EditionPhase {
    Generating,
    CheckingUnique(GeneratedDna),
    Accepted(GeneratedDna),
    Rejected(Rejection),
    Rendering {
        dna: String,
        profile: Option<String>,
        layers: Vec<DecodedLayer>,
    },
    Persisting {
        dna: String,
        profile: Option<String>,
        rendered: RenderedEdition,
    },
    NextEdition,
    Done,
    Abort,
}

/// Counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub editions: u32,
    pub duplicates: usize,
    pub unsatisfiable: usize,
    pub asset_failures: usize,
}

impl RunSummary {
    /// Total discarded attempts, the value compared against the tolerance.
    pub fn failures(&self) -> usize {
        self.duplicates + self.unsatisfiable + self.asset_failures
    }
}

/// Run-wide knobs taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub unique_dna_tolerance: usize,
    pub max_resample_attempts: usize,
    pub shuffle_editions: bool,
    pub first_edition: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            unique_dna_tolerance: DEFAULT_UNIQUE_DNA_TOLERANCE,
            max_resample_attempts: DEFAULT_MAX_RESAMPLE_ATTEMPTS,
            shuffle_editions: false,
            first_edition: 1,
        }
    }
}

impl RunSettings {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            unique_dna_tolerance: config.unique_dna_tolerance,
            max_resample_attempts: config.max_resample_attempts,
            shuffle_editions: config.shuffle_layer_configurations,
            first_edition: config.network.first_edition(),
        }
    }
}

pub struct Orchestrator {
    waves: Vec<Wave>,
    rules: RuleTable,
    selector: WeightedSelector,
    tolerance: usize,
    tracker: UniquenessTracker,
    supply: EditionSupply,
    renderer: Renderer,
    assembler: MetadataAssembler,
    rng: ChaCha8Rng,
    /// Edition currently being produced, counting from 1 across all waves
    edition_count: u64,
    summary: RunSummary,
}

impl Orchestrator {
    pub fn new(
        waves: Vec<Wave>,
        rules: RuleTable,
        settings: RunSettings,
        renderer: Renderer,
        assembler: MetadataAssembler,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let size = waves.last().map(|w| w.grow_edition_size_to).unwrap_or(0);
        let supply = if settings.shuffle_editions {
            EditionSupply::shuffled(settings.first_edition, size, &mut rng)
        } else {
            EditionSupply::new(settings.first_edition, size)
        };

        Self {
            waves,
            rules,
            selector: WeightedSelector::new(settings.max_resample_attempts),
            tolerance: settings.unique_dna_tolerance.max(1),
            tracker: UniquenessTracker::new(),
            supply,
            renderer,
            assembler,
            rng,
            edition_count: 1,
            summary: RunSummary::default(),
        }
    }

    /// Scan the catalog and wire every collaborator from the configuration.
    pub fn from_config(config: &GeneratorConfig, assets: Box<dyn AssetResolver>) -> Result<Self> {
        let waves = load_waves(config)?;
        let rules = config.rule_table()?;
        rules.validate(waves.iter().map(|wave| wave.layers.as_slice()))?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };

        Ok(Self::new(
            waves,
            rules,
            RunSettings::from_config(config),
            Renderer::new(config, assets),
            MetadataAssembler::from_config(config),
            rng,
        ))
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Generate every wave. The sink is finished even when the run fails, so
    /// completed editions stay on record.
    pub fn run(&mut self, sink: &mut dyn EditionSink) -> Result<RunSummary> {
        let outcome = self.run_waves(sink);
        let finished = sink.finish();
        outcome?;
        finished?;

        info!(
            "Generated {} editions ({} discarded attempts)",
            self.summary.editions,
            self.summary.failures()
        );
        Ok(self.summary.clone())
    }

    fn run_waves(&mut self, sink: &mut dyn EditionSink) -> Result<()> {
        self.rules
            .validate(self.waves.iter().map(|wave| wave.layers.as_slice()))?;

        for wave in 0..self.waves.len() {
            let target = self.waves[wave].grow_edition_size_to;
            info!(
                "Wave {}: growing collection to {} editions with {} layers",
                wave,
                target,
                self.waves[wave].layers.len()
            );

            let mut phase = EditionPhase::NextEdition;
            loop {
                phase = match phase {
                    EditionPhase::Done => break,
                    EditionPhase::Abort => {
                        error!(
                            "You need more layers or elements to grow your edition to {} artworks!",
                            target
                        );
                        return Err(StrataError::ToleranceExceeded {
                            tolerance: self.tolerance,
                            target,
                        });
                    }
                    current => self.step(current, wave, sink)?,
                };
            }
        }
        Ok(())
    }

    /// Advance one edition attempt by a single transition.
    pub fn step(&mut self, phase: EditionPhase, wave: usize, sink: &mut dyn EditionSink) -> Result<EditionPhase> {
        let next = match phase {
            EditionPhase::Generating => {
                match create_dna(&self.waves[wave].layers, &self.rules, &self.selector, &mut self.rng) {
                    Ok(generated) => EditionPhase::CheckingUnique(generated),
                    Err(e) if e.is_recoverable() => {
                        debug!("Discarding attempt: {}", e);
                        EditionPhase::Rejected(Rejection::Unsatisfiable)
                    }
                    Err(e) => return Err(e),
                }
            }

            EditionPhase::CheckingUnique(generated) => {
                if self.tracker.is_unique(&generated.strand.encode()) {
                    EditionPhase::Accepted(generated)
                } else {
                    EditionPhase::Rejected(Rejection::Duplicate)
                }
            }

            EditionPhase::Accepted(generated) => {
                let dna = generated.strand.encode();
                let layers = construct_layer_to_dna(&dna, &self.waves[wave].layers)?;
                EditionPhase::Rendering {
                    dna,
                    profile: generated.profile,
                    layers,
                }
            }

            EditionPhase::Rejected(reason) => {
                match reason {
                    Rejection::Duplicate => {
                        self.summary.duplicates += 1;
                        debug!("DNA exists! ({} failures)", self.summary.failures());
                    }
                    Rejection::Unsatisfiable => self.summary.unsatisfiable += 1,
                    Rejection::AssetLoad => self.summary.asset_failures += 1,
                }
                if self.summary.failures() >= self.tolerance {
                    EditionPhase::Abort
                } else {
                    EditionPhase::Generating
                }
            }

            EditionPhase::Rendering { dna, profile, layers } => {
                match self.renderer.render(&layers, &mut self.rng) {
                    Ok(rendered) => EditionPhase::Persisting { dna, profile, rendered },
                    Err(e) if e.is_recoverable() => {
                        warn!("Discarding edition attempt: {}", e);
                        EditionPhase::Rejected(Rejection::AssetLoad)
                    }
                    Err(e) => return Err(e),
                }
            }

            EditionPhase::Persisting { dna, profile, rendered } => {
                let number = self.supply.take().ok_or_else(|| StrataError::InvalidConfig {
                    reason: "ran out of edition numbers".to_string(),
                })?;
                let metadata = self.assembler.assemble(number, &dna, rendered.attributes);
                let edition = Edition {
                    number,
                    dna,
                    profile,
                    image: rendered.image,
                    frames: rendered.frames,
                    metadata,
                };
                sink.persist(&edition)?;
                self.tracker.commit(&edition.dna);
                self.summary.editions += 1;
                self.edition_count += 1;
                info!(
                    "Created edition: {}, with DNA: {}",
                    number,
                    dna_fingerprint(&edition.dna)
                );
                EditionPhase::NextEdition
            }

            EditionPhase::NextEdition => {
                if self.edition_count <= u64::from(self.waves[wave].grow_edition_size_to) {
                    EditionPhase::Generating
                } else {
                    EditionPhase::Done
                }
            }

            terminal @ (EditionPhase::Done | EditionPhase::Abort) => terminal,
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TraitElement;
    use crate::render::MemoryAssets;
    use crate::rules::{ElementRef, LayerRule, Profile};

    #[derive(Default)]
    struct MemorySink {
        editions: Vec<(u32, String)>,
        finished: bool,
    }

    impl EditionSink for MemorySink {
        fn persist(&mut self, edition: &Edition) -> Result<()> {
            self.editions.push((edition.number, edition.dna.clone()));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn text_config() -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        config.format.width = 8;
        config.format.height = 8;
        config.text.only = true;
        config
    }

    fn layer(index: usize, name: &str, files: &[&str]) -> Layer {
        let elements = files
            .iter()
            .enumerate()
            .map(|(i, f)| TraitElement::new(i as u32, f, f, 1.0))
            .collect();
        Layer::new(index, name, elements)
    }

    fn orchestrator(waves: Vec<Wave>, settings: RunSettings) -> Orchestrator {
        let config = text_config();
        Orchestrator::new(
            waves,
            RuleTable::default(),
            settings,
            Renderer::new(&config, Box::new(MemoryAssets::new())),
            MetadataAssembler::from_config(&config),
            ChaCha8Rng::seed_from_u64(42),
        )
    }

    #[test]
    fn test_bad_pin_fails_before_first_edition() {
        let files: Vec<String> = (0..50).map(|i| format!("trait{}.png", i)).collect();
        let files: Vec<&str> = files.iter().map(String::as_str).collect();
        let waves = vec![Wave {
            grow_edition_size_to: 40,
            layers: vec![layer(0, "Background", &files)],
        }];
        let mut rare = Profile::new("rare")
            .with_rule("Background", LayerRule::pinned(ElementRef::filename("missing.png")));
        rare.weight = 0.05;
        let rules = RuleTable::new(vec![Profile::new("common"), rare]);

        let config = text_config();
        let mut orchestrator = Orchestrator::new(
            waves,
            rules,
            RunSettings::default(),
            Renderer::new(&config, Box::new(MemoryAssets::new())),
            MetadataAssembler::from_config(&config),
            ChaCha8Rng::seed_from_u64(3),
        );
        let mut sink = MemorySink::default();
        let err = orchestrator.run(&mut sink).unwrap_err();

        assert_eq!(err.error_code(), "UNKNOWN_PINNED_ELEMENT");
        assert!(sink.editions.is_empty());
        assert!(sink.finished);
        assert_eq!(orchestrator.summary().editions, 0);
    }

    #[test]
    fn test_combinations_skip_bypassed_layers() {
        let wave = Wave {
            grow_edition_size_to: 1,
            layers: vec![
                layer(0, "Background", &["a.png", "b.png", "c.png"]),
                layer(1, "Eyes", &["x.png", "y.png"]),
                layer(2, "Glow", &["g.png", "h.png"]).with_bypass_dna(true),
            ],
        };
        assert_eq!(wave.combinations(), 6);
    }

    #[test]
    fn test_generates_unique_editions() {
        let waves = vec![Wave {
            grow_edition_size_to: 6,
            layers: vec![
                layer(0, "Background", &["a.png", "b.png", "c.png"]),
                layer(1, "Eyes", &["x.png", "y.png", "z.png"]),
            ],
        }];
        let mut sink = MemorySink::default();
        let summary = orchestrator(waves, RunSettings::default()).run(&mut sink).unwrap();

        assert_eq!(summary.editions, 6);
        assert!(sink.finished);
        let numbers: Vec<u32> = sink.editions.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);

        let mut dnas: Vec<&String> = sink.editions.iter().map(|(_, d)| d).collect();
        dnas.sort();
        dnas.dedup();
        assert_eq!(dnas.len(), 6);
    }

    #[test]
    fn test_aborts_after_tolerance() {
        let waves = vec![Wave {
            grow_edition_size_to: 3,
            layers: vec![layer(0, "Background", &["a.png"]), layer(1, "Eyes", &["x.png"])],
        }];
        let settings = RunSettings {
            unique_dna_tolerance: 5,
            ..Default::default()
        };
        let mut orchestrator = orchestrator(waves, settings);
        let mut sink = MemorySink::default();

        let err = orchestrator.run(&mut sink).unwrap_err();
        assert_eq!(err.error_code(), "TOLERANCE_EXCEEDED");
        assert_eq!(sink.editions.len(), 1);
        assert!(sink.finished);
        assert_eq!(orchestrator.summary().duplicates, 5);
        assert_eq!(orchestrator.summary().editions, 1);
    }

    #[test]
    fn test_waves_share_numbering_and_uniqueness() {
        let shared = layer(0, "Background", &["a.png", "b.png", "c.png", "d.png"]);
        let waves = vec![
            Wave {
                grow_edition_size_to: 2,
                layers: vec![shared.clone()],
            },
            Wave {
                grow_edition_size_to: 4,
                layers: vec![shared],
            },
        ];
        let mut sink = MemorySink::default();
        let summary = orchestrator(waves, RunSettings::default()).run(&mut sink).unwrap();

        assert_eq!(summary.editions, 4);
        let mut dnas: Vec<String> = sink.editions.iter().map(|(_, d)| d.clone()).collect();
        dnas.sort();
        assert_eq!(dnas, vec!["0:a.png", "1:b.png", "2:c.png", "3:d.png"]);
    }

    #[test]
    fn test_shuffled_numbers_start_at_zero_for_sol() {
        let waves = vec![Wave {
            grow_edition_size_to: 5,
            layers: vec![layer(0, "Background", &["a.png", "b.png", "c.png", "d.png", "e.png"])],
        }];
        let settings = RunSettings {
            shuffle_editions: true,
            first_edition: 0,
            ..Default::default()
        };
        let mut sink = MemorySink::default();
        orchestrator(waves, settings).run(&mut sink).unwrap();

        let mut numbers: Vec<u32> = sink.editions.iter().map(|(n, _)| *n).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_asset_failures_count_against_tolerance() {
        let mut config = text_config();
        config.text.only = false;
        let waves = vec![Wave {
            grow_edition_size_to: 1,
            layers: vec![layer(0, "Background", &["missing.png"])],
        }];
        let mut orchestrator = Orchestrator::new(
            waves,
            RuleTable::default(),
            RunSettings {
                unique_dna_tolerance: 3,
                ..Default::default()
            },
            Renderer::new(&config, Box::new(MemoryAssets::new())),
            MetadataAssembler::from_config(&config),
            ChaCha8Rng::seed_from_u64(1),
        );
        let mut sink = MemorySink::default();

        assert!(orchestrator.run(&mut sink).is_err());
        assert_eq!(orchestrator.summary().asset_failures, 3);
        assert!(sink.editions.is_empty());
    }

    #[test]
    fn test_step_rejects_duplicate() {
        let waves = vec![Wave {
            grow_edition_size_to: 2,
            layers: vec![layer(0, "Background", &["a.png"])],
        }];
        let mut orchestrator = orchestrator(waves, RunSettings::default());
        let mut sink = MemorySink::default();

        let mut phase = EditionPhase::Generating;
        while !matches!(phase, EditionPhase::NextEdition) {
            phase = orchestrator.step(phase, 0, &mut sink).unwrap();
        }
        let generated = orchestrator.step(EditionPhase::Generating, 0, &mut sink).unwrap();
        let checked = orchestrator.step(generated, 0, &mut sink).unwrap();
        assert!(matches!(checked, EditionPhase::Rejected(Rejection::Duplicate)));
    }
}
