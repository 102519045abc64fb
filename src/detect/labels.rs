use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// COCO-80 class names, indexed by class id.
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Class-id to name lookup.
#[derive(Clone, Debug)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn coco() -> Self {
        Self {
            names: COCO_CLASSES.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(anyhow!("class name list is empty"));
        }
        Ok(Self { names })
    }

    /// Load one class name per line; blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read labels file {}", path.display()))?;
        let names = raw
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
        Self::new(names).with_context(|| format!("labels file {} has no names", path.display()))
    }

    /// Name for `class_id`; unknown ids render as `class_<id>`.
    pub fn name(&self, class_id: u32) -> String {
        self.names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coco_lookup_and_fallback() {
        let names = ClassNames::coco();
        assert_eq!(names.len(), 80);
        assert_eq!(names.name(0), "person");
        assert_eq!(names.name(79), "toothbrush");
        assert_eq!(names.name(80), "class_80");
    }

    #[test]
    fn labels_file_skips_blank_lines() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "cat\n\n  dog  \n")?;
        let names = ClassNames::from_file(file.path())?;
        assert_eq!(names.len(), 2);
        assert_eq!(names.name(1), "dog");
        Ok(())
    }
}
