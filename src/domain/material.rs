// ==========================================
// 金属材料质检流转系统 - 材料批次领域模型
// ==========================================
// 聚合根: MaterialLot
// 质检记录/取样申请/实验室试验通过 lot_id 外键关联
// ==========================================

use crate::domain::types::{LotStatus, ShapeType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Dimensions - 尺寸（随形状变化）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub thickness_mm: Option<f64>,      // 厚度（板材/角钢/槽钢）
    pub width_mm: Option<f64>,          // 宽度（板材/角钢/槽钢）
    pub length_mm: Option<f64>,         // 长度
    pub diameter_mm: Option<f64>,       // 外径（管材/棒材）
    pub wall_thickness_mm: Option<f64>, // 壁厚（管材）
}

impl Dimensions {
    /// 按形状校验必填尺寸
    pub fn validate_for(&self, shape: ShapeType) -> Result<(), String> {
        let positive = |name: &str, v: Option<f64>| -> Result<(), String> {
            match v {
                Some(x) if x > 0.0 => Ok(()),
                Some(_) => Err(format!("{}必须大于0", name)),
                None => Err(format!("{}形状必须填写{}", shape, name)),
            }
        };

        match shape {
            ShapeType::Sheet => positive("thickness_mm", self.thickness_mm),
            ShapeType::Pipe => {
                positive("diameter_mm", self.diameter_mm)?;
                positive("wall_thickness_mm", self.wall_thickness_mm)?;
                if let (Some(d), Some(w)) = (self.diameter_mm, self.wall_thickness_mm) {
                    if w * 2.0 >= d {
                        return Err("壁厚过大: 2×壁厚必须小于外径".to_string());
                    }
                }
                Ok(())
            }
            ShapeType::Rod => positive("diameter_mm", self.diameter_mm),
            ShapeType::Angle | ShapeType::Channel => {
                positive("width_mm", self.width_mm)?;
                positive("thickness_mm", self.thickness_mm)
            }
            ShapeType::Other => Ok(()),
        }
    }
}

// ==========================================
// MaterialLot - 材料批次（聚合根）
// ==========================================
// 状态只能经流转引擎修改; 非状态字段只在 RECEIVED 时可改
// 从不物理删除: 判废/归档 + 软删除标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLot {
    // ===== 主键 =====
    pub lot_id: String,

    // ===== 材料信息 =====
    pub material_grade: String,  // 牌号
    pub shape: ShapeType,        // 形状
    pub dimensions: Dimensions,  // 尺寸
    pub quantity: f64,           // 数量
    pub unit: String,            // 单位（kg/t/m/pcs）

    // ===== 证书信息 =====
    pub certificate_number: String,
    pub certificate_date: NaiveDate,
    pub melt_number: Option<String>, // 炉号
    pub no_melt_number: bool,        // 无炉号标记
    pub batch_number: Option<String>,

    // ===== 关联 =====
    pub supplier_id: String,
    pub created_by: String,

    // ===== 流转状态 =====
    pub status: LotStatus,
    pub edit_requested: bool,
    pub edit_comment: Option<String>,
    pub is_deleted: bool,

    // ===== 并发控制 =====
    pub revision: i64, // 乐观锁版本号，每次写入 +1

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// NewMaterialLot - 入库登记输入
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaterialLot {
    pub material_grade: String,
    pub shape: ShapeType,
    pub dimensions: Dimensions,
    pub quantity: f64,
    pub unit: String,
    pub certificate_number: String,
    pub certificate_date: NaiveDate,
    pub melt_number: Option<String>,
    pub no_melt_number: bool,
    pub batch_number: Option<String>,
    pub supplier_id: String,
}

impl NewMaterialLot {
    /// 字段合法性校验
    ///
    /// # 返回
    /// - Ok(()): 校验通过
    /// - Err(String): 第一条不合法原因
    pub fn validate(&self) -> Result<(), String> {
        if self.material_grade.trim().is_empty() {
            return Err("牌号不能为空".to_string());
        }
        if !(self.quantity > 0.0) {
            return Err(format!("数量必须大于0: {}", self.quantity));
        }
        if self.unit.trim().is_empty() {
            return Err("单位不能为空".to_string());
        }
        if self.certificate_number.trim().is_empty() {
            return Err("证书编号不能为空".to_string());
        }
        if self.supplier_id.trim().is_empty() {
            return Err("供应商不能为空".to_string());
        }

        let has_melt = self
            .melt_number
            .as_deref()
            .map(|m| !m.trim().is_empty())
            .unwrap_or(false);
        if !has_melt && !self.no_melt_number {
            return Err("必须填写炉号，或勾选“无炉号”".to_string());
        }
        if has_melt && self.no_melt_number {
            return Err("已填写炉号时不能勾选“无炉号”".to_string());
        }

        self.dimensions.validate_for(self.shape)
    }
}

impl MaterialLot {
    /// 由入库登记创建新批次（状态 RECEIVED）
    pub fn from_new(lot_id: String, input: NewMaterialLot, created_by: String) -> Self {
        let now = Utc::now();
        Self {
            lot_id,
            material_grade: input.material_grade.trim().to_string(),
            shape: input.shape,
            dimensions: input.dimensions,
            quantity: input.quantity,
            unit: input.unit,
            certificate_number: input.certificate_number.trim().to_string(),
            certificate_date: input.certificate_date,
            melt_number: if input.no_melt_number { None } else { input.melt_number },
            no_melt_number: input.no_melt_number,
            batch_number: input.batch_number,
            supplier_id: input.supplier_id,
            created_by,
            status: LotStatus::Received,
            edit_requested: false,
            edit_comment: None,
            is_deleted: false,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 非状态字段是否可编辑
    pub fn is_editable(&self) -> bool {
        !self.is_deleted && self.status == LotStatus::Received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_input() -> NewMaterialLot {
        NewMaterialLot {
            material_grade: "09G2S".to_string(),
            shape: ShapeType::Sheet,
            dimensions: Dimensions {
                thickness_mm: Some(12.0),
                width_mm: Some(1500.0),
                length_mm: Some(6000.0),
                ..Default::default()
            },
            quantity: 4.2,
            unit: "t".to_string(),
            certificate_number: "CERT-001".to_string(),
            certificate_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            melt_number: Some("M-7781".to_string()),
            no_melt_number: false,
            batch_number: None,
            supplier_id: "SUP-1".to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(sheet_input().validate().is_ok());
    }

    #[test]
    fn test_validate_melt_number_rules() {
        let mut input = sheet_input();
        input.melt_number = None;
        assert!(input.validate().is_err());

        input.no_melt_number = true;
        assert!(input.validate().is_ok());

        input.melt_number = Some("M-1".to_string());
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_pipe_wall_thickness() {
        let mut input = sheet_input();
        input.shape = ShapeType::Pipe;
        input.dimensions = Dimensions {
            diameter_mm: Some(50.0),
            wall_thickness_mm: Some(30.0),
            ..Default::default()
        };
        assert!(input.validate().unwrap_err().contains("壁厚"));

        input.dimensions.wall_thickness_mm = Some(4.0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        let mut input = sheet_input();
        input.quantity = 0.0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_from_new_starts_received() {
        let lot = MaterialLot::from_new("L1".to_string(), sheet_input(), "wh_user".to_string());
        assert_eq!(lot.status, LotStatus::Received);
        assert_eq!(lot.revision, 0);
        assert!(!lot.edit_requested);
        assert!(lot.is_editable());
    }
}
