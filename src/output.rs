use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::types::Shop;

/// Records as pretty-printed JSON, non-ASCII text kept as is
pub fn to_json(shops: &[Shop]) -> Result<String> {
    Ok(serde_json::to_string_pretty(shops)?)
}

/// Write records to `path`, creating parent directories and replacing
/// any existing file
pub fn write_json(path: impl AsRef<Path>, shops: &[Shop]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut json = to_json(shops)?;
    json.push('\n');
    fs::write(path, json)?;

    log::info!("wrote {} records to {}", shops.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Shop> {
        vec![Shop {
            id: 1,
            category_main: "生活".into(),
            category_sub: "餐飲".into(),
            name: "老王牛肉麵".into(),
            phone: "03-1234567".into(),
            city: "桃園市".into(),
            district: "中壢區".into(),
            address: "民權路1號".into(),
            offers: "持卡9折".into(),
        }]
    }

    #[test]
    fn test_json_keeps_cjk_unescaped() {
        let json = to_json(&sample()).unwrap();
        assert!(json.contains("\"name\": \"老王牛肉麵\""));
        assert!(json.starts_with("[\n"));
    }

    #[test]
    fn test_write_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("shops.json");

        write_json(&path, &[]).unwrap();
        write_json(&path, &sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: Vec<Shop> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, sample());
    }
}
