// ==========================================
// 金属材料质检流转系统 - 状态流转规则表
// ==========================================
// 职责: (当前状态, 角色) → 允许的目标状态集合
// 红线: 纯函数、无副作用; 规则表进程内只构建一次，运行期不可变
// ==========================================

use crate::domain::types::{ActorRole, LotStatus};
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

type RuleTable = HashMap<(LotStatus, ActorRole), BTreeSet<LotStatus>>;

static RULES: OnceLock<RuleTable> = OnceLock::new();

fn rules() -> &'static RuleTable {
    RULES.get_or_init(build_rule_table)
}

fn build_rule_table() -> RuleTable {
    use ActorRole::*;
    use LotStatus::*;

    let entries: &[(LotStatus, ActorRole, &[LotStatus])] = &[
        // ===== 入库 / 质检 =====
        (Received, Warehouse, &[PendingQc]),
        (Received, Qc, &[PendingQc, QcPassed, QcFailed]),
        (PendingQc, Warehouse, &[EditRequested]),
        (PendingQc, Qc, &[QcPassed, QcFailed, LabCheckPending]),
        (QcPassed, Warehouse, &[EditRequested]),
        (QcPassed, Qc, &[LabCheckPending, ReadyForUse]),
        (QcPassed, Lab, &[LabCheckPending]),
        (QcFailed, Warehouse, &[Received, EditRequested]),
        (QcFailed, Qc, &[Rejected]),
        // ===== 实验室检验超状态 =====
        (
            LabCheckPending,
            Lab,
            &[QcPassed, QcFailed, ReadyForUse, Rejected, SamplesRequested, Testing],
        ),
        (SamplesRequested, Warehouse, &[SamplesCollected]),
        (SamplesRequested, Lab, &[SamplesCollected, Testing]),
        (SamplesCollected, Lab, &[Testing]),
        (
            Testing,
            Lab,
            &[QcPassed, QcFailed, ReadyForUse, Rejected, TestingCompleted],
        ),
        (TestingCompleted, Qc, &[ReadyForUse, Rejected]),
        (TestingCompleted, Lab, &[QcPassed, QcFailed, ReadyForUse, Rejected]),
        // ===== 生产 =====
        (ReadyForUse, Production, &[InUse]),
        (InUse, Production, &[ReadyForUse]),
        // ===== 修改申请 =====
        (EditRequested, Qc, &[Received]),
    ];

    let mut table = RuleTable::new();
    for (from, role, targets) in entries {
        table
            .entry((*from, *role))
            .or_insert_with(BTreeSet::new)
            .extend(targets.iter().copied());
    }

    tracing::debug!(rule_count = table.len(), "状态流转规则表已构建");
    table
}

/// 查询允许的目标状态
///
/// # 规则
/// - ADMIN: 任意当前状态 → 全部状态
/// - 其他角色: 表中未定义的组合返回空集合（视为禁止）
pub fn allowed_targets(current: LotStatus, role: ActorRole) -> BTreeSet<LotStatus> {
    if role == ActorRole::Admin {
        return LotStatus::ALL.iter().copied().collect();
    }
    rules()
        .get(&(current, role))
        .cloned()
        .unwrap_or_default()
}

/// 判断单条流转是否被规则表允许
pub fn is_allowed(current: LotStatus, target: LotStatus, role: ActorRole) -> bool {
    role == ActorRole::Admin
        || rules()
            .get(&(current, role))
            .map(|targets| targets.contains(&target))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_pairs_are_empty() {
        // 全组合遍历不 panic; 终态对普通角色无出边
        for status in LotStatus::ALL {
            for role in ActorRole::ALL {
                let targets = allowed_targets(status, role);
                if status.is_terminal() && role != ActorRole::Admin {
                    assert!(targets.is_empty(), "{} / {} 应无出边", status, role);
                }
            }
        }
        assert!(allowed_targets(LotStatus::Received, ActorRole::Lab).is_empty());
        assert!(allowed_targets(LotStatus::Received, ActorRole::Production).is_empty());
    }

    #[test]
    fn test_admin_override() {
        for status in LotStatus::ALL {
            let targets = allowed_targets(status, ActorRole::Admin);
            assert_eq!(targets.len(), LotStatus::ALL.len());
            assert!(is_allowed(status, LotStatus::Received, ActorRole::Admin));
        }
    }

    #[test]
    fn test_core_rows() {
        let wh = allowed_targets(LotStatus::Received, ActorRole::Warehouse);
        assert_eq!(wh.into_iter().collect::<Vec<_>>(), vec![LotStatus::PendingQc]);

        let qc = allowed_targets(LotStatus::PendingQc, ActorRole::Qc);
        assert!(qc.contains(&LotStatus::QcPassed));
        assert!(qc.contains(&LotStatus::QcFailed));
        assert!(qc.contains(&LotStatus::LabCheckPending));

        let lab = allowed_targets(LotStatus::Testing, ActorRole::Lab);
        for target in [
            LotStatus::QcPassed,
            LotStatus::QcFailed,
            LotStatus::ReadyForUse,
            LotStatus::Rejected,
        ] {
            assert!(lab.contains(&target));
        }

        assert!(is_allowed(LotStatus::EditRequested, LotStatus::Received, ActorRole::Qc));
        assert!(!is_allowed(LotStatus::EditRequested, LotStatus::Received, ActorRole::Warehouse));
        assert!(is_allowed(LotStatus::ReadyForUse, LotStatus::InUse, ActorRole::Production));
        assert!(is_allowed(LotStatus::InUse, LotStatus::ReadyForUse, ActorRole::Production));
        assert!(!is_allowed(LotStatus::Rejected, LotStatus::Received, ActorRole::Qc));
    }

    #[test]
    fn test_sample_sub_states() {
        assert!(is_allowed(
            LotStatus::SamplesRequested,
            LotStatus::SamplesCollected,
            ActorRole::Warehouse
        ));
        assert!(is_allowed(LotStatus::SamplesCollected, LotStatus::Testing, ActorRole::Lab));
        assert!(!is_allowed(LotStatus::SamplesCollected, LotStatus::Testing, ActorRole::Qc));
        assert!(is_allowed(
            LotStatus::TestingCompleted,
            LotStatus::ReadyForUse,
            ActorRole::Qc
        ));
    }
}
