// ==========================================
// 金属材料质检流转系统 - 实体守卫
// ==========================================
// 职责: 规则表之外、依赖关联实体的目标状态前置条件
// 红线: 纯函数，输入为流转前快照; 对所有角色（含 ADMIN）生效
// ==========================================

use crate::domain::inspection::InspectionRecord;
use crate::domain::lab_test::LabTest;
use crate::domain::material::MaterialLot;
use crate::domain::sample::SampleRequest;
use crate::domain::types::LotStatus;
use crate::repository::material_lot_repo::StatusWrite;

// ==========================================
// GuardFacts - 守卫判定所需的关联实体快照
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct GuardFacts {
    pub active_inspection: Option<InspectionRecord>,
    pub lab_tests: Vec<LabTest>,
    pub sample_requests: Vec<SampleRequest>,
}

impl GuardFacts {
    pub fn has_passed_test(&self) -> bool {
        self.lab_tests.iter().any(|t| t.is_passed == Some(true))
    }

    pub fn has_failed_test(&self) -> bool {
        self.lab_tests.iter().any(|t| t.is_passed == Some(false))
    }

    pub fn has_pending_test(&self) -> bool {
        self.lab_tests.iter().any(|t| t.is_passed.is_none())
    }

    pub fn has_collected_sample(&self) -> bool {
        self.sample_requests.iter().any(|r| r.is_collected)
    }

    pub fn has_inspection_defects(&self) -> bool {
        self.active_inspection
            .as_ref()
            .map(|r| r.defects.any())
            .unwrap_or(false)
    }

    /// 当前有效质检记录是否明确要求实验室复验
    fn inspection_requires_lab(&self) -> bool {
        self.active_inspection
            .as_ref()
            .map(|r| r.requires_lab_verification)
            .unwrap_or(false)
    }

    /// 检验超状态下: 无有效质检记录视为需要复验
    fn lab_verification_required_in_testing(&self) -> bool {
        self.active_inspection
            .as_ref()
            .map(|r| r.requires_lab_verification)
            .unwrap_or(true)
    }
}

/// 守卫策略（来自配置）
#[derive(Debug, Clone, Copy)]
pub struct GuardPolicy {
    pub edit_request_requires_comment: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            edit_request_requires_comment: true,
        }
    }
}

fn non_blank(comment: Option<&str>) -> Option<&str> {
    comment.map(str::trim).filter(|c| !c.is_empty())
}

/// 校验目标状态的实体守卫
///
/// # 规则
/// 1. QC_PASSED / READY_FOR_USE
///    - 检验超状态出发: 需有合格试验，或有效质检记录不要求复验
///    - 其他状态出发: 质检记录要求复验且无合格试验 → 拒绝
/// 2. REJECTED / QC_FAILED（检验超状态出发）: 不合格试验 / 质检缺陷 / 非空原因 三者其一
/// 3. SAMPLES_REQUESTED → TESTING: 至少一条已取样申请
/// 4. TESTING_COMPLETED: 至少一条试验且无进行中试验
/// 5. EDIT_REQUESTED: 需填写修改原因（可配置）
///
/// # 返回
/// - Err(String): 第一条未满足的条件
pub fn check_guards(
    lot: &MaterialLot,
    target: LotStatus,
    comment: Option<&str>,
    facts: &GuardFacts,
    policy: &GuardPolicy,
) -> Result<(), String> {
    let from = lot.status;

    match target {
        LotStatus::QcPassed | LotStatus::ReadyForUse => {
            if from.is_testing() {
                if facts.lab_verification_required_in_testing() && !facts.has_passed_test() {
                    return Err(format!(
                        "批次 {} 需实验室复验，尚无合格的试验结论，不能流转至 {}",
                        lot.lot_id, target
                    ));
                }
            } else if facts.inspection_requires_lab() && !facts.has_passed_test() {
                return Err(format!(
                    "批次 {} 的质检记录要求实验室复验，请先流转至 LAB_CHECK_PENDING",
                    lot.lot_id
                ));
            }
        }
        LotStatus::Rejected | LotStatus::QcFailed if from.is_testing() => {
            let has_reason = facts.has_failed_test()
                || facts.has_inspection_defects()
                || non_blank(comment).is_some();
            if !has_reason {
                return Err(format!(
                    "批次 {} 判定 {} 需要不合格试验结论、质检缺陷或填写原因",
                    lot.lot_id, target
                ));
            }
        }
        LotStatus::Testing if from == LotStatus::SamplesRequested => {
            if !facts.has_collected_sample() {
                return Err(format!("批次 {} 尚无已取样的取样申请，不能开始试验", lot.lot_id));
            }
        }
        LotStatus::TestingCompleted => {
            if facts.lab_tests.is_empty() {
                return Err(format!("批次 {} 尚未登记任何试验", lot.lot_id));
            }
            if facts.has_pending_test() {
                return Err(format!("批次 {} 仍有进行中的试验", lot.lot_id));
            }
        }
        LotStatus::EditRequested => {
            if policy.edit_request_requires_comment && non_blank(comment).is_none() {
                return Err("申请修改必须填写修改原因".to_string());
            }
        }
        _ => {}
    }

    Ok(())
}

/// 生成状态写入内容（状态与修改标记同一次写入）
///
/// - 进入 EDIT_REQUESTED: 置 edit_requested，记录原因
/// - 离开 EDIT_REQUESTED: 清除标记与原因
pub fn build_status_write(lot: &MaterialLot, target: LotStatus, comment: Option<&str>) -> StatusWrite {
    if target == LotStatus::EditRequested {
        return StatusWrite {
            status: target,
            edit_requested: true,
            edit_comment: non_blank(comment).map(str::to_string),
        };
    }

    if lot.status == LotStatus::EditRequested {
        return StatusWrite {
            status: target,
            edit_requested: false,
            edit_comment: None,
        };
    }

    StatusWrite {
        status: target,
        edit_requested: lot.edit_requested,
        edit_comment: lot.edit_comment.clone(),
    }
}
