//! Survey parameters
//!
//! The preference survey filled in before recommendations are requested:
//! recipient gender, age bracket, occasion, interests and a budget range.
//!
//! Every enumerated field has a fixed vocabulary whose wire spelling is the
//! snake_case string the recommendation API expects (`19_29`, `new_year`, ...).

use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Declares a closed survey vocabulary with its wire spellings
macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in survey display order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire spelling
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        Error::InvalidInput(format!(
                            concat!("unknown ", stringify!($name), " '{}'"),
                            s
                        ))
                    })
            }
        }
    };
}

vocabulary! {
    /// Gift recipient gender
    Gender {
        Male => "male",
        Female => "female",
    }
}

vocabulary! {
    /// Gift recipient age bracket (8 fixed buckets)
    AgeBracket {
        Infant => "0_2",
        Toddler => "3_5",
        Child => "6_12",
        Teen => "13_18",
        YoungAdult => "19_29",
        Adult => "30_45",
        MiddleAged => "45_65",
        Senior => "65_plus",
    }
}

vocabulary! {
    /// Occasion the gift is for
    Occasion {
        Birthday => "birthday",
        Anniversary => "anniversary",
        Valentines => "valentines",
        NewYear => "new_year",
        HouseWarming => "house_warming",
        MothersDay => "mothers_day",
        FathersDay => "fathers_day",
    }
}

vocabulary! {
    /// Recipient interest (14-value vocabulary)
    Interest {
        Sports => "sports",
        Music => "music",
        Books => "books",
        Technology => "technology",
        Travel => "travel",
        Art => "art",
        Food => "food",
        Fitness => "fitness",
        Health => "health",
        Photography => "photography",
        Fashion => "fashion",
        Pets => "pets",
        HomeDecor => "home_decor",
        MoviesTv => "movies_tv",
    }
}

impl Gender {
    /// Label shown on the survey form
    pub fn label(&self) -> String {
        match self {
            Gender::Male => "Erkek".to_string(),
            Gender::Female => "Kadın".to_string(),
        }
    }
}

impl AgeBracket {
    /// Label shown on the survey form (`19_29` → `19-29`)
    pub fn label(&self) -> String {
        self.as_str().replace('_', "-")
    }
}

impl Occasion {
    /// Label shown on the survey form (`new_year` → `new year`)
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl Interest {
    /// Label shown on the survey form (`home_decor` → `home decor`)
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// Completed preference survey
///
/// Immutable once recommendations have been fetched for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyParameters {
    pub gender: Gender,
    pub age_bracket: AgeBracket,
    pub occasion: Occasion,
    #[serde(default)]
    pub interests: BTreeSet<Interest>,
    pub min_budget: f64,
    pub max_budget: f64,
}

impl SurveyParameters {
    /// Check the budget range
    ///
    /// Both bounds must be finite and non-negative, and `min_budget` must not
    /// exceed `max_budget`.
    pub fn validate(&self) -> Result<()> {
        if !self.min_budget.is_finite() || !self.max_budget.is_finite() {
            return Err(Error::InvalidInput("budget must be a finite number".to_string()));
        }
        if self.min_budget < 0.0 || self.max_budget < 0.0 {
            return Err(Error::InvalidInput("budget must not be negative".to_string()));
        }
        if self.min_budget > self.max_budget {
            return Err(Error::InvalidInput(format!(
                "min_budget ({}) exceeds max_budget ({})",
                self.min_budget, self.max_budget
            )));
        }
        Ok(())
    }

    /// Random survey for quick manual testing
    ///
    /// Picks 1-3 distinct interests, a minimum budget in [0, 300) and a
    /// maximum 100-1099 above it.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let how_many = rng.gen_range(1..=3);
        let interests = Interest::ALL
            .choose_multiple(rng, how_many)
            .copied()
            .collect();

        let min_budget = rng.gen_range(0..300) as f64;
        let max_budget = min_budget + rng.gen_range(100..1100) as f64;

        Self {
            gender: *Gender::ALL.choose(rng).unwrap_or(&Gender::Female),
            age_bracket: *AgeBracket::ALL.choose(rng).unwrap_or(&AgeBracket::Adult),
            occasion: *Occasion::ALL.choose(rng).unwrap_or(&Occasion::Birthday),
            interests,
            min_budget,
            max_budget,
        }
    }
}

/// Survey plus the identity token
///
/// Body of the recommendation request and the object kept under the
/// `user_params` session key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRequest {
    pub email: String,
    #[serde(flatten)]
    pub parameters: SurveyParameters,
}
