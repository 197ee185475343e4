//! 项目 JSON 格式
//!
//! 内容就是 [`SessionData`]：`{"segments": [...], "components": [...]}`。
//! 管段长度在读取时由端点重新计算。

use crate::error::FileError;
use pipecad_core::session::SessionData;
use std::fs;
use std::path::Path;

pub fn to_json(data: &SessionData) -> Result<String, FileError> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn from_json(text: &str) -> Result<SessionData, FileError> {
    Ok(serde_json::from_str(text)?)
}

/// 保存为 JSON 文件
pub fn save(data: &SessionData, path: &Path) -> Result<(), FileError> {
    fs::write(path, to_json(data)?)?;
    tracing::info!(
        "Saved {} segments, {} components to {}",
        data.segments.len(),
        data.components.len(),
        path.display()
    );
    Ok(())
}

/// 从 JSON 文件加载
pub fn load(path: &Path) -> Result<SessionData, FileError> {
    let data = from_json(&fs::read_to_string(path)?)?;
    tracing::info!(
        "Loaded {} segments, {} components from {}",
        data.segments.len(),
        data.components.len(),
        path.display()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipecad_core::component::{ComponentInstance, ComponentKind};
    use pipecad_core::geometry::PipeSegment;
    use pipecad_core::math::Point3;

    fn sample() -> SessionData {
        SessionData {
            segments: vec![PipeSegment::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 4.0),
                "3/4\"",
                "pex",
            )],
            components: vec![ComponentInstance::new(ComponentKind::Meter, Point3::new(3.0, 0.0, 4.0))],
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house.json");

        let data = sample();
        save(&data, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_stored_length_is_recomputed() {
        let json = to_json(&sample()).unwrap();
        let tampered = json.replace("\"length\": 5.0", "\"length\": 99.0");
        assert_ne!(json, tampered);

        let data = from_json(&tampered).unwrap();
        assert_eq!(data.segments[0].length(), 5.0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(from_json("{ not json"), Err(FileError::Json(_))));
    }
}
