// src/taxonomy.rs
//
// Closed vocabularies for garment classification. Every enum field in a
// GarmentClassification is bound to one of these sets; the wire tokens
// (serde renames) are part of the external-model contract and must not
// change without a schema generation bump.
use serde::{Deserialize, Serialize};

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $token)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }

            /// Wire tokens, comma-separated, for prompt construction.
            pub fn token_list() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }

            pub fn tokens() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary! {
    Department {
        Women => "women",
        Men => "men",
        Unisex => "unisex",
        Kids => "kids",
    }
}

vocabulary! {
    MainCategory {
        Clothing => "clothing",
        Shoes => "shoes",
        Accessories => "accessories",
        Jewelry => "jewelry",
        Bags => "bags",
    }
}

vocabulary! {
    SubCategory {
        Tops => "tops",
        Shirts => "shirts",
        Bottoms => "bottoms",
        Dresses => "dresses",
        PartyDresses => "party_dresses",
        Bridal => "bridal",
        Skirts => "skirts",
        Shorts => "shorts",
        Outerwear => "outerwear",
        Knitwear => "knitwear",
        Activewear => "activewear",
        Lingerie => "lingerie",
        Beachwear => "beachwear",
        Tailoring => "tailoring",
        Jumpsuits => "jumpsuits",
        Vests => "vests",
        Sets => "sets",
        Recycling => "recycling",
    }
}

vocabulary! {
    Shape {
        ALine => "a-line",
        Sheath => "sheath",
        Mermaid => "mermaid",
        Wrap => "wrap",
        Empire => "empire",
        ShirtDress => "shirt-dress",
        Straight => "straight",
        Flare => "flare",
        Circle => "circle",
        Asymmetric => "asymmetric",
        Balloon => "balloon",
        Box => "box",
        Trapeze => "trapeze",
        Other => "other",
    }
}

vocabulary! {
    Fit {
        Slim => "slim",
        Regular => "regular",
        Relaxed => "relaxed",
        Oversized => "oversized",
        Cropped => "cropped",
        Elongated => "elongated",
        Compression => "compression",
        Bodycon => "bodycon",
    }
}

vocabulary! {
    SleeveLength {
        Short => "short",
        Long => "long",
        ThreeQuarter => "3/4",
        Sleeveless => "sleeveless",
        Strapless => "strapless",
    }
}

vocabulary! {
    SleeveType {
        Classic => "classic",
        Puff => "puff",
        Bell => "bell",
        Bishop => "bishop",
        Batwing => "batwing",
        Butterfly => "butterfly",
        Cap => "cap",
        Baloon => "baloon",
        Flare => "flare",
        Split => "split",
        Tulip => "tulip",
        Other => "other",
    }
}

vocabulary! {
    SleeveConstruction {
        SetIn => "set-in",
        Raglan => "raglan",
        Kimono => "kimono",
        Dolman => "dolman",
        Dropped => "dropped",
    }
}

vocabulary! {
    Neckline {
        VNeck => "v-neck",
        UNeck => "u-neck",
        RoundNeck => "round-neck",
        BoatNeck => "boat-neck",
        SquareNeck => "square-neck",
        Sweetheart => "sweetheart",
        Halter => "halter",
        HighNeck => "high-neck",
        OffShoulder => "off-shoulder",
        OneShoulder => "one-shoulder",
        CowlNeck => "cowl-neck",
        Strapless => "strapless",
    }
}

vocabulary! {
    Closure {
        Button => "button",
        Zipper => "zipper",
        Drawstring => "drawstring",
        Elastic => "elastic",
        Clasp => "clasp",
        Wrap => "wrap",
        Velcro => "velcro",
        None => "none",
        SnapButton => "snap_button",
        HiddenZipper => "hidden_zipper",
    }
}

vocabulary! {
    Aesthetic {
        Vintage => "vintage",
        Minimalist => "minimalist",
        Boho => "boho",
        Streetwear => "streetwear",
        Romantic => "romantic",
        Classic => "classic",
        Grunge => "grunge",
        Preppy => "preppy",
        Glam => "glam",
        Sporty => "sporty",
        Retro => "retro",
        Y2k => "y2k",
        Cottagecore => "cottagecore",
        Utility => "utility",
    }
}

vocabulary! {
    Occasion {
        Casual => "casual",
        Work => "work",
        Formal => "formal",
        Party => "party",
        Beachwear => "beachwear",
        Activewear => "activewear",
        Lounge => "lounge",
        NightOut => "night_out",
        SpecialEvent => "special_event",
    }
}

vocabulary! {
    Condition {
        NewWithTags => "new_with_tags",
        Excellent => "excellent",
        VeryGood => "very_good",
        Good => "good",
    }
}

vocabulary! {
    BackDetail {
        VBack => "v-back",
        UBack => "u-back",
        OpenBack => "open-back",
        LowBack => "low-back",
        Racerback => "racerback",
        Keyhole => "keyhole",
        LaceUp => "lace-up",
        Closed => "closed",
        CrossedStraps => "crossed-straps",
    }
}

vocabulary! {
    Finish {
        Textured => "textured",
        Smooth => "smooth",
        Glossy => "glossy",
        Matte => "matte",
        Metallic => "metallic",
        Sheer => "sheer",
        Distressed => "distressed",
        Ribbed => "ribbed",
        Pleated => "pleated",
        Quilted => "quilted",
        Coated => "coated",
        Embossed => "embossed",
        Fuzzy => "fuzzy",
        Crinkled => "crinkled",
    }
}

vocabulary! {
    GarmentLength {
        Mini => "mini",
        Short => "short",
        KneeLength => "knee_length",
        Midi => "midi",
        Maxi => "maxi",
        FloorLength => "floor_length",
        Cropped => "cropped",
        Standard => "standard",
        SevenEighths => "7_8_length",
    }
}

vocabulary! {
    PocketType {
        Front => "front_pockets",
        Back => "back_pockets",
        Side => "side_pockets",
        Cargo => "cargo_pockets",
        Chest => "chest_pockets",
        Internal => "internal_pockets",
        None => "none",
    }
}

vocabulary! {
    Color {
        Black => "black",
        White => "white",
        Grey => "grey",
        Beige => "beige",
        Brown => "brown",
        Blue => "blue",
        LightBlue => "light_blue",
        NavyBlue => "navy_blue",
        Red => "red",
        Burgundy => "burgundy",
        Pink => "pink",
        Rose => "rose",
        Green => "green",
        Olive => "olive",
        Yellow => "yellow",
        Orange => "orange",
        Purple => "purple",
        Gold => "gold",
        Silver => "silver",
        Multi => "multi",
    }
}

vocabulary! {
    Pattern {
        Solid => "solid",
        Striped => "striped",
        Checkered => "checkered",
        Floral => "floral",
        AnimalPrint => "animal_print",
        PolkaDot => "polka_dot",
        Geometric => "geometric",
        Abstract => "abstract",
        TieDye => "tie_dye",
        Paisley => "paisley",
        Herringbone => "herringbone",
        AcidWash => "acid_wash",
    }
}

vocabulary! {
    FabricFiber {
        Cotton => "cotton",
        Linen => "linen",
        Silk => "silk",
        Wool => "wool",
        Cashmere => "cashmere",
        Hemp => "hemp",
        Polyester => "polyester",
        Viscose => "viscose",
        Elastane => "elastane",
        Polyamide => "polyamide",
        Acrylic => "acrylic",
        Acetate => "acetate",
        Rayon => "rayon",
        Lyocell => "lyocell",
        Leather => "leather",
        Suede => "suede",
        Fur => "fur",
        FauxLeather => "faux_leather",
        Denim => "denim",
        Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tokens_round_trip() {
        for color in Color::ALL {
            let json = serde_json::to_string(color).unwrap();
            let back: Color = serde_json::from_str(&json).unwrap();
            assert_eq!(*color, back);
        }
        assert_eq!(
            serde_json::to_string(&SleeveLength::ThreeQuarter).unwrap(),
            "\"3/4\""
        );
        assert_eq!(
            serde_json::to_string(&GarmentLength::SevenEighths).unwrap(),
            "\"7_8_length\""
        );
        assert_eq!(serde_json::to_string(&Shape::ALine).unwrap(), "\"a-line\"");
    }

    #[test]
    fn token_list_is_comma_separated() {
        let list = Department::token_list();
        assert_eq!(list, "women, men, unisex, kids");
    }
}
