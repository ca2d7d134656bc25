use crate::models::LabelTable;
use crate::utils::error::ClassifierError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// 单个类别的预测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    /// 类别索引
    pub index: usize,
    /// 类别名称
    pub label: String,
    /// 原始分数
    pub score: f32,
    /// 百分比 (score × 100)
    pub percentage: f32,
}

/// 完整的预测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 处理耗时（秒）
    pub processing_time: f32,
    /// 按分数降序排列的预测
    pub predictions: Vec<RankedLabel>,
    /// 输出格式
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    /// 模型信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

/// 模型信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub backend: String,
    pub input_width: u32,
    pub input_height: u32,
    pub num_classes: usize,
}

impl PredictionResult {
    /// 最高分的预测
    pub fn top(&self) -> Option<&RankedLabel> {
        self.predictions.first()
    }
}

/// 结果格式化器
pub struct ResultFormatter;

impl ResultFormatter {
    /// 按分数降序排列类别（同分保持原索引顺序），取前k个
    pub fn rank(scores: &[f32], labels: &LabelTable, k: usize) -> Result<Vec<RankedLabel>> {
        if labels.len() != scores.len() {
            return Err(ClassifierError::LabelMismatch {
                labels: labels.len(),
                scores: scores.len(),
            });
        }

        if k == 0 {
            return Err(ClassifierError::InvalidInput(
                "k must be at least 1".to_string(),
            ));
        }

        let mut indices: Vec<usize> = (0..scores.len()).collect();
        // sort_by 是稳定排序
        indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        indices
            .into_iter()
            .take(k)
            .map(|index| {
                let label = labels.get(index).ok_or_else(|| {
                    ClassifierError::Internal(format!("Class index {} out of range", index))
                })?;
                Ok(RankedLabel {
                    index,
                    label: label.to_string(),
                    score: scores[index],
                    percentage: scores[index] * 100.0,
                })
            })
            .collect()
    }

    /// 单行摘要（arg-max模式）
    pub fn format_summary(predictions: &[RankedLabel]) -> String {
        match predictions.first() {
            Some(top) => format!(
                "Predicted Class: {} with Confidence: {}",
                top.label, top.score
            ),
            None => "No prediction".to_string(),
        }
    }

    /// 纯文本输出（top-K模式），每行一个类别
    pub fn format_plain_text(predictions: &[RankedLabel]) -> String {
        predictions
            .iter()
            .map(|p| format!("{}: {:.2}%", p.label, p.percentage))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 按输出格式渲染
    pub fn render(result: &PredictionResult) -> Result<String> {
        match result.output_format.as_deref() {
            Some("text") if result.predictions.len() == 1 => {
                Ok(Self::format_summary(&result.predictions))
            }
            Some("text") => Ok(Self::format_plain_text(&result.predictions)),
            Some("json") | None => Ok(serde_json::to_string_pretty(result)?),
            Some(other) => Err(ClassifierError::InvalidInput(format!(
                "Unsupported output format '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn labels(names: &[&str]) -> LabelTable {
        LabelTable::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_rank_top3() {
        let ranked = ResultFormatter::rank(&[0.1, 0.7, 0.2], &labels(&["A", "B", "C"]), 3).unwrap();

        let names: Vec<&str> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert_relative_eq!(ranked[0].percentage, 70.0);
        assert_relative_eq!(ranked[1].percentage, 20.0);
        assert_relative_eq!(ranked[2].percentage, 10.0);
    }

    #[test]
    fn test_rank_tie_prefers_lower_index() {
        let ranked = ResultFormatter::rank(&[0.5, 0.5], &labels(&["A", "B"]), 1).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].label, "A");
        assert_eq!(ranked[0].index, 0);
        assert_relative_eq!(ranked[0].percentage, 50.0);
    }

    #[test]
    fn test_rank_k_larger_than_classes() {
        let ranked = ResultFormatter::rank(&[0.3, 0.9], &labels(&["x", "y"]), 5).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].label, "y");
    }

    #[test]
    fn test_rank_length_mismatch_fails() {
        let err = ResultFormatter::rank(&[0.1, 0.2, 0.3], &labels(&["A", "B"]), 1).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::LabelMismatch { labels: 2, scores: 3 }
        ));

        let err = ResultFormatter::rank(&[0.1], &labels(&["A", "B"]), 1).unwrap_err();
        assert!(matches!(err, ClassifierError::LabelMismatch { .. }));
    }

    #[test]
    fn test_rank_zero_k_rejected() {
        assert!(ResultFormatter::rank(&[1.0], &labels(&["A"]), 0).is_err());
    }

    #[test]
    fn test_rank_stable_for_many_ties() {
        let scores = [0.2, 0.4, 0.2, 0.4, 0.2];
        let ranked = ResultFormatter::rank(&scores, &LabelTable::numeric(5), 5).unwrap();
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_format_summary_and_text() {
        let ranked = ResultFormatter::rank(&[0.25, 0.75], &labels(&["cat", "dog"]), 2).unwrap();

        assert_eq!(
            ResultFormatter::format_summary(&ranked),
            "Predicted Class: dog with Confidence: 0.75"
        );
        assert_eq!(
            ResultFormatter::format_plain_text(&ranked),
            "dog: 75.00%\ncat: 25.00%"
        );
        assert_eq!(ResultFormatter::format_summary(&[]), "No prediction");
    }

    #[test]
    fn test_render_formats() {
        let mut result = PredictionResult {
            processing_time: 0.01,
            predictions: ResultFormatter::rank(&[0.5], &labels(&["only"]), 1).unwrap(),
            output_format: Some("text".to_string()),
            model_info: None,
        };
        assert_eq!(
            ResultFormatter::render(&result).unwrap(),
            "Predicted Class: only with Confidence: 0.5"
        );

        result.output_format = None;
        let json = ResultFormatter::render(&result).unwrap();
        assert!(json.contains("\"label\": \"only\""));

        result.output_format = Some("csv".to_string());
        assert!(ResultFormatter::render(&result).is_err());
    }
}
