//! Letter shape catalog
//!
//! Read-only table of target shapes, one per letter, in pedagogical order.
//! Coordinates live in the normalized 0-200 space.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::TraceConfig;
use crate::error::{EngineError, EngineResult};
use crate::path::{downsample, PathSampler};
use crate::types::{Difficulty, LetterId, Point, CANVAS_EXTENT};

/// Suggested drawing direction of a stroke, used by the UI for hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeDirection {
    TopToBottom,
    BottomToTop,
    LeftToRight,
    RightToLeft,
    Diagonal,
    Curve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStroke {
    /// Path data (`M`, `L`, `C`, `A`, `Z`)
    pub d: String,
    pub direction: StrokeDirection,
    pub start_point: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePath {
    pub letter_id: LetterId,
    /// 1-based position in the teaching sequence
    pub order: u32,
    /// Teaching group the letter belongs to
    pub group: u32,
    pub strokes: Vec<TraceStroke>,
    pub bounding_box: BoundingBox,
    pub difficulty: Difficulty,
}

impl TracePath {
    /// All strokes sampled in order; empty when any stroke is malformed
    pub fn sample(&self, sampler: &PathSampler) -> Vec<Point> {
        sampler.sample_strokes(self.strokes.iter().map(|s| s.d.as_str()))
    }

    /// Target points normalized to the configured count
    pub fn target_points(&self, config: &TraceConfig) -> Vec<Point> {
        let raw = self.sample(&PathSampler::from_config(config));
        downsample(&raw, config.target_sample_count)
    }
}

// ==================== Catalog ====================

#[derive(Debug, Clone)]
pub struct LetterCatalog {
    letters: Vec<TracePath>,
    index: HashMap<LetterId, usize>,
}

impl LetterCatalog {
    /// Builds a catalog, sorting by order and rejecting duplicate ids or orders
    pub fn new(mut letters: Vec<TracePath>) -> EngineResult<Self> {
        letters.sort_by_key(|l| l.order);
        let mut index = HashMap::with_capacity(letters.len());
        for (i, letter) in letters.iter().enumerate() {
            if index.insert(letter.letter_id.clone(), i).is_some() {
                return Err(EngineError::Config(format!(
                    "duplicate letter id '{}' in catalog",
                    letter.letter_id
                )));
            }
            let bounds = letter.bounding_box;
            if !(bounds.width > 0.0 && bounds.width <= CANVAS_EXTENT)
                || !(bounds.height > 0.0 && bounds.height <= CANVAS_EXTENT)
            {
                return Err(EngineError::Config(format!(
                    "letter '{}' has bounding box {}x{} outside the canvas",
                    letter.letter_id, bounds.width, bounds.height
                )));
            }
            if i > 0 && letters[i - 1].order == letter.order {
                return Err(EngineError::Config(format!(
                    "letters '{}' and '{}' share order {}",
                    letters[i - 1].letter_id,
                    letter.letter_id,
                    letter.order
                )));
            }
        }
        Ok(Self { letters, index })
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let letters: Vec<TracePath> = serde_json::from_str(json)?;
        Self::new(letters)
    }

    /// The 29-letter Turkish alphabet in teaching order
    pub fn builtin() -> Self {
        let letters: Vec<TracePath> = BUILTIN_LETTERS
            .iter()
            .enumerate()
            .map(|(i, def)| def.to_trace_path(i as u32 + 1))
            .collect();
        let index = letters
            .iter()
            .enumerate()
            .map(|(i, l)| (l.letter_id.clone(), i))
            .collect();
        Self { letters, index }
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn get(&self, letter_id: &str) -> Option<&TracePath> {
        self.index.get(letter_id).map(|&i| &self.letters[i])
    }

    pub fn contains(&self, letter_id: &str) -> bool {
        self.index.contains_key(letter_id)
    }

    pub fn by_order(&self, order: u32) -> Option<&TracePath> {
        self.letters.iter().find(|l| l.order == order)
    }

    /// The letter taught right after `letter_id`
    pub fn next_letter(&self, letter_id: &str) -> Option<&TracePath> {
        self.index
            .get(letter_id)
            .and_then(|&i| self.letters.get(i + 1))
    }

    /// Letters in teaching order
    pub fn iter(&self) -> impl Iterator<Item = &TracePath> {
        self.letters.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.letters.iter().map(|l| l.letter_id.as_str())
    }

    pub fn group(&self, group: u32) -> impl Iterator<Item = &TracePath> {
        self.letters.iter().filter(move |l| l.group == group)
    }

    /// Target points for one letter, `None` for an unknown id
    pub fn target_points(&self, letter_id: &str, config: &TraceConfig) -> Option<Vec<Point>> {
        self.get(letter_id).map(|l| l.target_points(config))
    }

    /// Samples every letter in parallel
    pub fn sample_all(&self, config: &TraceConfig) -> HashMap<LetterId, Vec<Point>> {
        self.letters
            .par_iter()
            .map(|l| (l.letter_id.clone(), l.target_points(config)))
            .collect()
    }
}

impl Default for LetterCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ==================== Built-in Shapes ====================

struct StrokeDef {
    d: &'static str,
    direction: StrokeDirection,
    start: (f64, f64),
}

struct LetterDef {
    id: &'static str,
    group: u32,
    difficulty: Difficulty,
    strokes: &'static [StrokeDef],
    bounds: (f64, f64),
}

impl LetterDef {
    fn to_trace_path(&self, order: u32) -> TracePath {
        TracePath {
            letter_id: self.id.to_string(),
            order,
            group: self.group,
            strokes: self
                .strokes
                .iter()
                .map(|s| TraceStroke {
                    d: s.d.to_string(),
                    direction: s.direction,
                    start_point: Point::new(s.start.0, s.start.1),
                })
                .collect(),
            bounding_box: BoundingBox {
                width: self.bounds.0,
                height: self.bounds.1,
            },
            difficulty: self.difficulty,
        }
    }
}

use Difficulty::{Easy, Hard, Medium};
use StrokeDirection::{BottomToTop, Curve, Diagonal, LeftToRight, TopToBottom};

const fn stroke(d: &'static str, direction: StrokeDirection, x: f64, y: f64) -> StrokeDef {
    StrokeDef {
        d,
        direction,
        start: (x, y),
    }
}

const ROUND_BOWL: &str = "M 170,60 C 170,20 130,20 100,20 C 60,20 30,40 30,100 C 30,160 60,180 100,180 C 130,180 170,180 170,140";
const CEDILLA: &str = "M 90,180 C 90,190 100,200 80,200";

const BUILTIN_LETTERS: &[LetterDef] = &[
    // group 1: easy vowels
    LetterDef {
        id: "E",
        group: 1,
        difficulty: Easy,
        strokes: &[
            stroke("M 40,20 L 40,180", TopToBottom, 40.0, 20.0),
            stroke("M 40,20 L 140,20", LeftToRight, 40.0, 20.0),
            stroke("M 40,100 L 120,100", LeftToRight, 40.0, 100.0),
            stroke("M 40,180 L 140,180", LeftToRight, 40.0, 180.0),
        ],
        bounds: (140.0, 180.0),
    },
    LetterDef {
        id: "A",
        group: 1,
        difficulty: Easy,
        strokes: &[
            stroke("M 20,180 L 100,20 L 180,180", Diagonal, 20.0, 180.0),
            stroke("M 60,120 L 140,120", LeftToRight, 60.0, 120.0),
        ],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "İ",
        group: 1,
        difficulty: Easy,
        strokes: &[
            stroke("M 100,40 L 100,180", TopToBottom, 100.0, 40.0),
            stroke("M 100,20 A 2,2 0 1,1 100,24", Curve, 100.0, 20.0),
        ],
        bounds: (60.0, 180.0),
    },
    // group 2: easy consonants
    LetterDef {
        id: "L",
        group: 2,
        difficulty: Easy,
        strokes: &[
            stroke("M 40,20 L 40,180", TopToBottom, 40.0, 20.0),
            stroke("M 40,180 L 140,180", LeftToRight, 40.0, 180.0),
        ],
        bounds: (140.0, 180.0),
    },
    LetterDef {
        id: "T",
        group: 2,
        difficulty: Easy,
        strokes: &[
            stroke("M 20,20 L 180,20", LeftToRight, 20.0, 20.0),
            stroke("M 100,20 L 100,180", TopToBottom, 100.0, 20.0),
        ],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "N",
        group: 2,
        difficulty: Medium,
        strokes: &[
            stroke("M 40,180 L 40,20", BottomToTop, 40.0, 180.0),
            stroke("M 40,20 L 160,180", Diagonal, 40.0, 20.0),
            stroke("M 160,180 L 160,20", BottomToTop, 160.0, 180.0),
        ],
        bounds: (160.0, 180.0),
    },
    // group 3: more vowels
    LetterDef {
        id: "O",
        group: 3,
        difficulty: Medium,
        strokes: &[stroke(
            "M 100,20 C 160,20 180,60 180,100 C 180,140 160,180 100,180 C 40,180 20,140 20,100 C 20,60 40,20 100,20",
            Curve,
            100.0,
            20.0,
        )],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "U",
        group: 3,
        difficulty: Medium,
        strokes: &[stroke(
            "M 40,20 L 40,140 C 40,170 70,180 100,180 C 130,180 160,170 160,140 L 160,20",
            Curve,
            40.0,
            20.0,
        )],
        bounds: (160.0, 180.0),
    },
    // group 4: more consonants
    LetterDef {
        id: "R",
        group: 4,
        difficulty: Hard,
        strokes: &[
            stroke("M 40,180 L 40,20", BottomToTop, 40.0, 180.0),
            stroke(
                "M 40,20 L 120,20 C 150,20 160,50 160,65 C 160,80 150,100 120,100 L 40,100",
                Curve,
                40.0,
                20.0,
            ),
            stroke("M 100,100 L 160,180", Diagonal, 100.0, 100.0),
        ],
        bounds: (160.0, 180.0),
    },
    LetterDef {
        id: "M",
        group: 4,
        difficulty: Hard,
        strokes: &[
            stroke("M 20,180 L 20,20", BottomToTop, 20.0, 180.0),
            stroke("M 20,20 L 100,120", Diagonal, 20.0, 20.0),
            stroke("M 100,120 L 180,20", Diagonal, 100.0, 120.0),
            stroke("M 180,20 L 180,180", TopToBottom, 180.0, 20.0),
        ],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "K",
        group: 4,
        difficulty: Medium,
        strokes: &[
            stroke("M 40,20 L 40,180", TopToBottom, 40.0, 20.0),
            stroke("M 150,20 L 40,100", Diagonal, 150.0, 20.0),
            stroke("M 40,100 L 150,180", Diagonal, 40.0, 100.0),
        ],
        bounds: (150.0, 180.0),
    },
    // group 5: dotted and new vowels
    LetterDef {
        id: "Ö",
        group: 5,
        difficulty: Medium,
        strokes: &[
            stroke(
                "M 100,40 C 160,40 180,80 180,120 C 180,160 160,180 100,180 C 40,180 20,160 20,120 C 20,80 40,40 100,40",
                Curve,
                100.0,
                40.0,
            ),
            stroke("M 80,18 A 4,4 0 1,1 80,22", Curve, 80.0, 18.0),
            stroke("M 120,18 A 4,4 0 1,1 120,22", Curve, 120.0, 18.0),
        ],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "Ü",
        group: 5,
        difficulty: Medium,
        strokes: &[
            stroke(
                "M 40,40 L 40,140 C 40,170 70,180 100,180 C 130,180 160,170 160,140 L 160,40",
                Curve,
                40.0,
                40.0,
            ),
            stroke("M 60,18 A 4,4 0 1,1 60,22", Curve, 60.0, 18.0),
            stroke("M 140,18 A 4,4 0 1,1 140,22", Curve, 140.0, 18.0),
        ],
        bounds: (160.0, 180.0),
    },
    LetterDef {
        id: "I",
        group: 5,
        difficulty: Easy,
        strokes: &[stroke("M 100,20 L 100,180", TopToBottom, 100.0, 20.0)],
        bounds: (60.0, 180.0),
    },
    // group 6: intermediate consonants
    LetterDef {
        id: "S",
        group: 6,
        difficulty: Hard,
        strokes: &[stroke(
            "M 150,50 C 150,20 100,20 80,20 C 40,20 20,40 20,65 C 20,90 40,100 100,110 C 160,120 180,130 180,155 C 180,180 150,180 120,180 C 80,180 50,180 50,155",
            Curve,
            150.0,
            50.0,
        )],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "D",
        group: 6,
        difficulty: Medium,
        strokes: &[
            stroke("M 40,20 L 40,180", TopToBottom, 40.0, 20.0),
            stroke(
                "M 40,20 L 100,20 C 160,20 180,60 180,100 C 180,140 160,180 100,180 L 40,180",
                Curve,
                40.0,
                20.0,
            ),
        ],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "B",
        group: 6,
        difficulty: Hard,
        strokes: &[
            stroke("M 40,20 L 40,180", TopToBottom, 40.0, 20.0),
            stroke(
                "M 40,20 L 110,20 C 150,20 160,45 160,60 C 160,75 150,90 120,95 L 40,100",
                Curve,
                40.0,
                20.0,
            ),
            stroke(
                "M 40,100 L 120,100 C 160,100 170,120 170,140 C 170,160 160,180 120,180 L 40,180",
                Curve,
                40.0,
                100.0,
            ),
        ],
        bounds: (170.0, 180.0),
    },
    LetterDef {
        id: "Y",
        group: 6,
        difficulty: Medium,
        strokes: &[
            stroke("M 20,20 L 100,100", Diagonal, 20.0, 20.0),
            stroke("M 180,20 L 100,100", Diagonal, 180.0, 20.0),
            stroke("M 100,100 L 100,180", TopToBottom, 100.0, 100.0),
        ],
        bounds: (180.0, 180.0),
    },
    // group 7: advanced consonants
    LetterDef {
        id: "Z",
        group: 7,
        difficulty: Medium,
        strokes: &[
            stroke("M 20,20 L 180,20", LeftToRight, 20.0, 20.0),
            stroke("M 180,20 L 20,180", Diagonal, 180.0, 20.0),
            stroke("M 20,180 L 180,180", LeftToRight, 20.0, 180.0),
        ],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "Ç",
        group: 7,
        difficulty: Hard,
        strokes: &[
            stroke(ROUND_BOWL, Curve, 170.0, 60.0),
            stroke(CEDILLA, Curve, 90.0, 180.0),
        ],
        bounds: (170.0, 200.0),
    },
    LetterDef {
        id: "Ş",
        group: 7,
        difficulty: Hard,
        strokes: &[
            stroke(
                "M 150,50 C 150,20 100,20 80,20 C 40,20 20,40 20,65 C 20,90 40,100 100,110 C 160,120 180,130 180,155 C 180,175 150,180 120,180 C 80,180 50,180 50,155",
                Curve,
                150.0,
                50.0,
            ),
            stroke(CEDILLA, Curve, 90.0, 180.0),
        ],
        bounds: (180.0, 200.0),
    },
    LetterDef {
        id: "P",
        group: 7,
        difficulty: Medium,
        strokes: &[
            stroke("M 40,180 L 40,20", BottomToTop, 40.0, 180.0),
            stroke(
                "M 40,20 L 120,20 C 160,20 170,45 170,65 C 170,85 160,100 120,100 L 40,100",
                Curve,
                40.0,
                20.0,
            ),
        ],
        bounds: (170.0, 180.0),
    },
    LetterDef {
        id: "G",
        group: 7,
        difficulty: Hard,
        strokes: &[stroke(
            "M 170,60 C 170,20 130,20 100,20 C 60,20 30,40 30,100 C 30,160 60,180 100,180 C 140,180 170,170 170,130 L 170,100 L 120,100",
            Curve,
            170.0,
            60.0,
        )],
        bounds: (170.0, 180.0),
    },
    // group 8: hardest letters
    LetterDef {
        id: "C",
        group: 8,
        difficulty: Medium,
        strokes: &[stroke(ROUND_BOWL, Curve, 170.0, 60.0)],
        bounds: (170.0, 180.0),
    },
    LetterDef {
        id: "H",
        group: 8,
        difficulty: Medium,
        strokes: &[
            stroke("M 40,20 L 40,180", TopToBottom, 40.0, 20.0),
            stroke("M 40,100 L 160,100", LeftToRight, 40.0, 100.0),
            stroke("M 160,20 L 160,180", TopToBottom, 160.0, 20.0),
        ],
        bounds: (160.0, 180.0),
    },
    LetterDef {
        id: "F",
        group: 8,
        difficulty: Easy,
        strokes: &[
            stroke("M 40,20 L 40,180", TopToBottom, 40.0, 20.0),
            stroke("M 40,20 L 150,20", LeftToRight, 40.0, 20.0),
            stroke("M 40,100 L 120,100", LeftToRight, 40.0, 100.0),
        ],
        bounds: (150.0, 180.0),
    },
    LetterDef {
        id: "V",
        group: 8,
        difficulty: Medium,
        strokes: &[stroke("M 20,20 L 100,180 L 180,20", Diagonal, 20.0, 20.0)],
        bounds: (180.0, 180.0),
    },
    LetterDef {
        id: "Ğ",
        group: 8,
        difficulty: Hard,
        strokes: &[
            stroke(
                "M 170,60 C 170,20 130,20 100,20 C 60,20 30,40 30,100 C 30,160 60,180 100,180 C 140,180 170,170 170,130 L 170,100 L 120,100",
                Curve,
                170.0,
                60.0,
            ),
            stroke("M 70,8 C 90,16 110,16 130,8", Curve, 70.0, 8.0),
        ],
        bounds: (170.0, 180.0),
    },
    LetterDef {
        id: "J",
        group: 8,
        difficulty: Medium,
        strokes: &[
            stroke(
                "M 140,20 L 140,140 C 140,170 110,180 80,180 C 50,180 30,170 30,150",
                Curve,
                140.0,
                20.0,
            ),
            stroke("M 140,8 A 2,2 0 1,1 140,12", Curve, 140.0, 8.0),
        ],
        bounds: (160.0, 180.0),
    },
];
