use crate::foundation::core::Rgba8;

impl serde::Serialize for Rgba8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let hex = if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        };
        serializer.serialize_str(&hex)
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Arr(Vec<f64>),
        }

        match <Repr as serde::Deserialize>::deserialize(deserializer)? {
            Repr::Str(s) => parse_color(&s).map_err(serde::de::Error::custom),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(from_unit(*r, *g, *b, 1.0)),
                [r, g, b, a] => Ok(from_unit(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

/// Parse a color name (`"orange"`, `"grey"`, ...) or `#RRGGBB` / `#RRGGBBAA`.
pub fn parse_color(s: &str) -> Result<Rgba8, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    named_color(&s.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown color \"{s}\" (use a basic color name or #RRGGBB)"))
}

fn parse_hex(s: &str) -> Result<Rgba8, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !s.is_ascii() {
        return Err("hex color must be #RRGGBB or #RRGGBBAA".to_owned());
    }
    match s.len() {
        6 => Ok(Rgba8::opaque(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Rgba8 {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: hex_byte(&s[6..8])?,
        }),
        _ => Err("hex color must be #RRGGBB or #RRGGBBAA".to_owned()),
    }
}

fn from_unit(r: f64, g: f64, b: f64, a: f64) -> Rgba8 {
    fn to_u8(x: f64) -> u8 {
        (x.clamp(0.0, 1.0) * 255.0).round() as u8
    }
    Rgba8 {
        r: to_u8(r),
        g: to_u8(g),
        b: to_u8(b),
        a: to_u8(a),
    }
}

// Single-word CSS names, which is what matplotlib resolves them to.
fn named_color(name: &str) -> Option<Rgba8> {
    let rgb = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "navy" => (0, 0, 128),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "yellow" => (255, 255, 0),
        "gold" => (255, 215, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "grey" | "gray" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "teal" => (0, 128, 128),
        "brown" => (165, 42, 42),
        "pink" => (255, 192, 203),
        "deepskyblue" => (0, 191, 255),
        _ => return None,
    };
    Some(Rgba8::opaque(rgb.0, rgb.1, rgb.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_hex() {
        assert_eq!(parse_color("orange").unwrap(), Rgba8::opaque(255, 165, 0));
        assert_eq!(parse_color("Grey").unwrap(), Rgba8::opaque(128, 128, 128));
        assert_eq!(parse_color("#00BFFF").unwrap(), Rgba8::opaque(0, 191, 255));
        assert_eq!(
            parse_color("#00bfff80").unwrap(),
            Rgba8 {
                r: 0,
                g: 191,
                b: 255,
                a: 128
            }
        );
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#zzzzzz").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn deserialize_string_and_array_forms() {
        let c: Rgba8 = serde_json::from_str("\"cyan\"").unwrap();
        assert_eq!(c, Rgba8::opaque(0, 255, 255));

        let c: Rgba8 = serde_json::from_str("[1.0, 0.0, 0.0]").unwrap();
        assert_eq!(c, Rgba8::opaque(255, 0, 0));

        let c: Rgba8 = serde_json::from_str("[0.0, 0.0, 0.0, 0.5]").unwrap();
        assert_eq!(c.a, 128);

        assert!(serde_json::from_str::<Rgba8>("[1.0]").is_err());
    }

    #[test]
    fn serializes_as_hex() {
        assert_eq!(
            serde_json::to_string(&Rgba8::opaque(0, 191, 255)).unwrap(),
            "\"#00bfff\""
        );
        let back: Rgba8 = serde_json::from_str("\"#0000ff80\"").unwrap();
        assert_eq!(serde_json::to_string(&back).unwrap(), "\"#0000ff80\"");
    }
}
