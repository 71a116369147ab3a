use tileprobe_types::tile::TileKey;

/// Tile URL template with `{s}`, `{x}`, `{y}` and `{z}` placeholders.
///
/// # Examples
///
/// ```
/// use tileprobe::source::TileUrlTemplate;
/// use tileprobe_types::tile::TileKey;
///
/// let template = TileUrlTemplate::new("https://{s}.tiles.example.com/{z}/{x}/{y}.pbf");
/// assert_eq!(
///     template.url(&TileKey::new(3, 5, 10)),
///     "https://c.tiles.example.com/10/3/5.pbf"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl TileUrlTemplate {
    /// Template with the default `a`, `b`, `c` subdomains.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        }
    }

    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Subdomain for a tile: `|x + y| mod n`, `None` without subdomains.
    pub fn subdomain(&self, key: &TileKey) -> Option<&str> {
        if self.subdomains.is_empty() {
            return None;
        }
        let idx = (key.x + key.y).unsigned_abs() % self.subdomains.len() as u64;
        Some(&self.subdomains[idx as usize])
    }

    pub fn url(&self, key: &TileKey) -> String {
        self.template
            .replace("{s}", self.subdomain(key).unwrap_or_default())
            .replace("{z}", &key.z.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_rotation() {
        let template = TileUrlTemplate::new("{s}");
        assert_eq!(template.url(&TileKey::new(0, 0, 1)), "a");
        assert_eq!(template.url(&TileKey::new(1, 0, 1)), "b");
        assert_eq!(template.url(&TileKey::new(1, 1, 1)), "c");
        assert_eq!(template.url(&TileKey::new(2, 1, 1)), "a");
        assert_eq!(template.url(&TileKey::new(-2, 0, 1)), "c");
    }

    #[test]
    fn test_no_subdomains() {
        let template = TileUrlTemplate::new("tiles/{z}/{x}/{y}.json").with_subdomains(Vec::<String>::new());
        assert_eq!(template.subdomain(&TileKey::new(1, 1, 1)), None);
        assert_eq!(template.url(&TileKey::new(1, 2, 3)), "tiles/3/1/2.json");
    }
}
