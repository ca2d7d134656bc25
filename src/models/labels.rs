use crate::utils::error::ClassifierError;
use crate::Result;
use std::fs;
use std::path::Path;

/// 类别标签表：类别索引 → 可读名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// 以类别索引作为标签
    pub fn numeric(num_classes: usize) -> Self {
        Self::new((0..num_classes).map(|i| i.to_string()).collect())
    }

    /// 从文本文件加载，每行一个标签，忽略空行
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ClassifierError::ModelLoad(format!(
                "Failed to read labels from {}: {}",
                path.display(),
                e
            ))
        })?;

        let table = Self::parse(&content);
        if table.is_empty() {
            return Err(ClassifierError::ModelLoad(format!(
                "Label file {} is empty",
                path.display()
            )));
        }

        tracing::info!("Loaded {} labels from {}", table.len(), path.display());
        tracing::debug!("First labels: {:?}", table.labels.iter().take(5).collect::<Vec<_>>());

        Ok(table)
    }

    pub fn parse(content: &str) -> Self {
        let labels = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
