// ==========================================
// 金属材料质检流转系统 - 质检记录领域模型
// ==========================================
// 红线: 每个批次同一时刻最多一条有效记录
// 新记录会使旧记录失效（软删除），不允许两条同时有效
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// InspectionDefects - 缺陷标记（固定集合）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionDefects {
    pub surface_cracks: bool, // 表面裂纹
    pub delamination: bool,   // 分层
    pub corrosion: bool,      // 锈蚀
    pub dents: bool,          // 凹坑/压痕
    pub scale: bool,          // 氧化皮
    pub geometry: bool,       // 形状缺陷（弯曲/扭曲）
}

impl InspectionDefects {
    /// 是否存在任一缺陷
    pub fn any(&self) -> bool {
        self.surface_cracks
            || self.delamination
            || self.corrosion
            || self.dents
            || self.scale
            || self.geometry
    }

    /// 已标记缺陷的名称列表（用于日志/通知）
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.surface_cracks {
            names.push("surface_cracks");
        }
        if self.delamination {
            names.push("delamination");
        }
        if self.corrosion {
            names.push("corrosion");
        }
        if self.dents {
            names.push("dents");
        }
        if self.scale {
            names.push("scale");
        }
        if self.geometry {
            names.push("geometry");
        }
        names
    }
}

// ==========================================
// InspectionCriteria - 检查项（合格/不合格）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionCriteria {
    pub marking_readable: bool,    // 标识可读
    pub material_matches: bool,    // 材质与证书一致
    pub dimensions_match: bool,    // 尺寸与证书一致
    pub certificate_correct: bool, // 证书填写正确
}

impl InspectionCriteria {
    pub fn all_passed(&self) -> bool {
        self.marking_readable
            && self.material_matches
            && self.dimensions_match
            && self.certificate_correct
    }
}

impl Default for InspectionCriteria {
    fn default() -> Self {
        Self {
            marking_readable: true,
            material_matches: true,
            dimensions_match: true,
            certificate_correct: true,
        }
    }
}

// ==========================================
// InspectionRecord - 质检记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub inspection_id: String,
    pub lot_id: String,
    pub inspector_id: String,

    pub criteria: InspectionCriteria,
    pub defects: InspectionDefects,
    /// 化学成分读数（元素 → 质量百分比）
    pub chemical_composition: BTreeMap<String, f64>,
    pub notes: Option<String>,
    pub requires_lab_verification: bool,

    pub is_deleted: bool, // 被新记录取代后置为 true
    pub created_at: DateTime<Utc>,
}

// ==========================================
// NewInspection - 质检录入输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInspection {
    pub criteria: InspectionCriteria,
    pub defects: InspectionDefects,
    pub chemical_composition: BTreeMap<String, f64>,
    pub notes: Option<String>,
    pub requires_lab_verification: bool,
}

impl NewInspection {
    pub fn validate(&self) -> Result<(), String> {
        for (element, value) in &self.chemical_composition {
            if element.trim().is_empty() {
                return Err("化学元素名称不能为空".to_string());
            }
            if !(0.0..=100.0).contains(value) {
                return Err(format!("化学成分 {} 超出范围: {}", element, value));
            }
        }
        Ok(())
    }
}

impl InspectionRecord {
    /// 是否有不合格检查项或缺陷
    pub fn has_findings(&self) -> bool {
        !self.criteria.all_passed() || self.defects.any()
    }
}
