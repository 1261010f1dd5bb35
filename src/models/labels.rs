//! Closed vocabularies used by profiles, the catalog and the scoring model.
//!
//! Every label parses case-insensitively (including a few aliases the questionnaire UI
//! emits) and serializes back to one canonical display string.

/// Error returned when a string does not name any variant of a label type
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("'{value}' is not a valid {kind}")]
pub struct LabelError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a label enum with its canonical strings and aliases.
///
/// Generates `label()`, `ALL`, `FromStr`, `Display` and string-based serde impls.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical display string
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = LabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($label) $(|| s.eq_ignore_ascii_case($alias))* {
                        return Ok($name::$variant);
                    }
                )+
                Err(LabelError {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = LabelError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.label().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

label_enum! {
    /// Taxonomic category of a perfume's scent profile
    FragranceFamily {
        Citrus => "Citrus",
        Green => "Green",
        Aromatic => "Aromatic",
        Floral => "Floral",
        WhiteFloral => "White Floral",
        Fruity => "Fruity",
        Chypre => "Chypre",
        Woody => "Woody",
        Amber => "Amber",
        OrientalSpicy => "Oriental/Spicy" | "Oriental" | "Spicy",
        Leather => "Leather",
        Musk => "Musk",
    }
}

label_enum! {
    SkinType {
        Dry => "Dry",
        Balanced => "Balanced" | "Normal",
        Oily => "Oily",
    }
}

label_enum! {
    SkinTemperature {
        Cool => "Cool",
        Neutral => "Neutral",
        Warm => "Warm",
    }
}

label_enum! {
    /// Generic three-step scale (hydration, sensitivities, tolerances)
    Level {
        Low => "Low",
        Medium => "Medium" | "Med",
        High => "High",
    }
}

label_enum! {
    /// Average ambient temperature in degrees Celsius
    TemperatureBand {
        Cold => "<15" | "<15°C",
        Mild => "15-25" | "15-25°C",
        Warm => "26-32" | "26-32°C",
        Hot => ">32" | ">32°C",
    }
}

label_enum! {
    /// Average relative humidity in percent
    HumidityBand {
        Dry => "<30" | "<30%",
        Moderate => "30-60" | "30-60%",
        Humid => ">60" | ">60%",
    }
}

label_enum! {
    Airflow {
        Still => "Still",
        Normal => "Normal",
        Breezy => "Breezy",
    }
}

label_enum! {
    /// Perceived strength of a perfume, or the strength a user prefers
    Intensity {
        Light => "Light" | "Skin scent",
        Moderate => "Moderate",
        Strong => "Strong",
    }
}

label_enum! {
    Sillage {
        Light => "Light",
        Moderate => "Moderate",
        Heavy => "Heavy",
    }
}

label_enum! {
    Answer {
        Yes => "Yes",
        No => "No",
        Unsure => "Unsure",
    }
}

label_enum! {
    SprayLocation {
        SkinOnly => "Skin only",
        ClothesOnly => "Clothes only",
        Mix => "Mix",
    }
}

label_enum! {
    Presentation {
        Feminine => "Feminine",
        Masculine => "Masculine",
        Unisex => "Unisex",
    }
}

label_enum! {
    Season {
        Summer => "Summer",
        Winter => "Winter",
        AllYear => "All-year" | "All year",
    }
}

label_enum! {
    Role {
        User => "user",
        Admin => "admin",
    }
}

impl Intensity {
    /// Position on the Light=1 / Moderate=2 / Strong=3 scale
    pub fn scale(&self) -> i32 {
        match self {
            Intensity::Light => 1,
            Intensity::Moderate => 2,
            Intensity::Strong => 3,
        }
    }
}

impl TemperatureBand {
    /// Buckets a temperature in degrees Celsius
    pub fn from_celsius(celsius: f64) -> Self {
        if celsius < 15.0 {
            TemperatureBand::Cold
        } else if celsius <= 25.0 {
            TemperatureBand::Mild
        } else if celsius <= 32.0 {
            TemperatureBand::Warm
        } else {
            TemperatureBand::Hot
        }
    }
}

impl HumidityBand {
    /// Buckets a relative humidity percentage
    pub fn from_percent(percent: f64) -> Self {
        if percent < 30.0 {
            HumidityBand::Dry
        } else if percent <= 60.0 {
            HumidityBand::Moderate
        } else {
            HumidityBand::Humid
        }
    }
}
