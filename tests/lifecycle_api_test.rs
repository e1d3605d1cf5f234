// ==========================================
// 批次全生命周期 API 集成测试
// ==========================================
// 职责: 入库 → 质检 → 实验室检验 → 放行 → 投产 的完整链路
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod lifecycle_api_test {
    use material_qc::api::ApiError;
    use material_qc::app::AppState;
    use material_qc::domain::inspection::{InspectionDefects, NewInspection};
    use material_qc::domain::lab_test::NewLabTest;
    use material_qc::domain::sample::NewSampleRequest;
    use material_qc::domain::types::{ActorRole, LotStatus, TestKind};
    use material_qc::engine::TransitionErrorKind;

    use crate::test_helpers::{create_test_state, sheet_lot_input};

    // ==========================================
    // 测试辅助
    // ==========================================

    fn step(state: &AppState, lot_id: &str, target: LotStatus, actor: &str, role: ActorRole) {
        let outcome = state
            .workflow_api
            .transition(lot_id, target, actor, role, None)
            .unwrap();
        assert!(
            outcome.success,
            "{} → {} 应该成功: {}",
            role, target, outcome.message
        );
    }

    fn sample_input() -> NewSampleRequest {
        NewSampleRequest {
            sample_size: 2.0,
            sample_unit: "pcs".to_string(),
            test_kinds: vec![TestKind::Mechanical, TestKind::Chemical],
            cutting_location: Some("板头 500mm".to_string()),
        }
    }

    fn received_lot(state: &AppState) -> String {
        state
            .lot_api
            .create_lot(sheet_lot_input(), "wh_user", ActorRole::Warehouse)
            .unwrap()
            .lot_id
    }

    // ==========================================
    // 测试1: 完整实验室检验链路
    // ==========================================
    #[test]
    fn test_full_lab_verification_flow() {
        let (_temp_file, state) = create_test_state();

        // 1. 入库登记
        let lot = state
            .lot_api
            .create_lot(sheet_lot_input(), "wh_user", ActorRole::Warehouse)
            .unwrap();
        assert_eq!(lot.status, LotStatus::Received);
        let lot_id = lot.lot_id.clone();

        // 2. 提交质检
        step(&state, &lot_id, LotStatus::PendingQc, "wh_user", ActorRole::Warehouse);

        // 3. 质检发现需要实验室复验
        let inspection = state
            .inspection_api
            .record_inspection(
                &lot_id,
                NewInspection {
                    requires_lab_verification: true,
                    notes: Some("证书化学成分与标识不符".to_string()),
                    ..Default::default()
                },
                "qc_user",
                ActorRole::Qc,
            )
            .unwrap();
        assert!(inspection.requires_lab_verification);

        let blocked = state
            .workflow_api
            .transition(&lot_id, LotStatus::QcPassed, "qc_user", ActorRole::Qc, None)
            .unwrap();
        assert_eq!(blocked.error_kind, Some(TransitionErrorKind::GuardFailed));

        step(&state, &lot_id, LotStatus::LabCheckPending, "qc_user", ActorRole::Qc);

        // 4. 申请取样
        let request = state
            .sample_api
            .create_sample_request(&lot_id, sample_input(), "lab_user", ActorRole::Lab)
            .unwrap();
        step(&state, &lot_id, LotStatus::SamplesRequested, "lab_user", ActorRole::Lab);

        // 未取样不能送检
        let premature = state
            .sample_api
            .mark_sent_to_lab(&request.request_id, "lab_user", ActorRole::Lab);
        assert!(matches!(premature, Err(ApiError::BusinessRuleViolation(_))));

        // 5. 仓库取样，实验室接收
        let collected = state
            .sample_api
            .mark_collected(&request.request_id, "wh_user", ActorRole::Warehouse)
            .unwrap();
        assert!(collected.is_collected);
        let sent = state
            .sample_api
            .mark_sent_to_lab(&request.request_id, "lab_user", ActorRole::Lab)
            .unwrap();
        assert!(sent.is_sent_to_lab);

        step(&state, &lot_id, LotStatus::Testing, "lab_user", ActorRole::Lab);

        // 6. 没有试验不能完成检验
        let empty = state
            .workflow_api
            .transition(&lot_id, LotStatus::TestingCompleted, "lab_user", ActorRole::Lab, None)
            .unwrap();
        assert_eq!(empty.error_kind, Some(TransitionErrorKind::GuardFailed));

        let test = state
            .lab_test_api
            .create_lab_test(
                &lot_id,
                NewLabTest {
                    sample_request_id: Some(request.request_id.clone()),
                    test_kind: TestKind::Mechanical,
                    test_reference: Some("GB/T 228.1".to_string()),
                },
                "lab_user",
                ActorRole::Lab,
            )
            .unwrap();
        assert!(test.is_passed.is_none());

        let pending = state
            .workflow_api
            .transition(&lot_id, LotStatus::TestingCompleted, "lab_user", ActorRole::Lab, None)
            .unwrap();
        assert_eq!(pending.error_kind, Some(TransitionErrorKind::GuardFailed));

        let completed = state
            .lab_test_api
            .complete_lab_test(
                &test.test_id,
                true,
                Some("σв=510 МПа, δ=24%".to_string()),
                "lab_user",
                ActorRole::Lab,
            )
            .unwrap();
        assert_eq!(completed.is_passed, Some(true));

        // 结论只能录入一次
        let again = state.lab_test_api.complete_lab_test(
            &test.test_id,
            false,
            None,
            "lab_user",
            ActorRole::Lab,
        );
        assert!(matches!(again, Err(ApiError::BusinessRuleViolation(_))));

        step(&state, &lot_id, LotStatus::TestingCompleted, "lab_user", ActorRole::Lab);

        // 7. 质检放行，生产领用
        step(&state, &lot_id, LotStatus::ReadyForUse, "qc_user", ActorRole::Qc);
        step(&state, &lot_id, LotStatus::InUse, "prod_user", ActorRole::Production);

        let final_lot = state.lot_api.get_lot(&lot_id).unwrap();
        assert_eq!(final_lot.status, LotStatus::InUse);

        // 8. 审计历史
        let history = state.workflow_api.lot_history(&lot_id).unwrap();
        let count = |kind: &str| history.iter().filter(|l| l.action_type == kind).count();
        assert_eq!(count("CreateLot"), 1);
        assert_eq!(count("RecordInspection"), 1);
        assert_eq!(count("CreateSampleRequest"), 1);
        assert_eq!(count("MarkSampleCollected"), 1);
        assert_eq!(count("MarkSampleSent"), 1);
        assert_eq!(count("CreateLabTest"), 1);
        assert_eq!(count("CompleteLabTest"), 1);
        assert_eq!(count("StatusTransition"), 7);

        println!("✅ 完整实验室检验链路测试通过: {} 条审计记录", history.len());
    }

    // ==========================================
    // 测试2: 角色权限
    // ==========================================
    #[test]
    fn test_role_restrictions() {
        let (_temp_file, state) = create_test_state();

        let denied = state
            .lot_api
            .create_lot(sheet_lot_input(), "lab_user", ActorRole::Lab);
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));

        let blank = state
            .lot_api
            .create_lot(sheet_lot_input(), "  ", ActorRole::Warehouse);
        assert!(matches!(blank, Err(ApiError::InvalidInput(_))));

        let lot_id = received_lot(&state);
        step(&state, &lot_id, LotStatus::PendingQc, "wh_user", ActorRole::Warehouse);

        let inspection = state.inspection_api.record_inspection(
            &lot_id,
            NewInspection::default(),
            "wh_user",
            ActorRole::Warehouse,
        );
        assert!(matches!(inspection, Err(ApiError::Forbidden(_))));

        // 不在实验室流程中不能申请取样
        let sample = state.sample_api.create_sample_request(
            &lot_id,
            sample_input(),
            "qc_user",
            ActorRole::Qc,
        );
        assert!(matches!(sample, Err(ApiError::BusinessRuleViolation(_))));

        let forbidden = state
            .workflow_api
            .transition(&lot_id, LotStatus::InUse, "prod_user", ActorRole::Production, None)
            .unwrap();
        assert_eq!(forbidden.error_kind, Some(TransitionErrorKind::Forbidden));

        let targets = state
            .workflow_api
            .allowed_targets_for_lot(&lot_id, ActorRole::Warehouse)
            .unwrap();
        assert_eq!(targets, vec![LotStatus::EditRequested]);

        println!("✅ 角色权限测试通过");
    }

    // ==========================================
    // 测试3: 修改申请与解锁
    // ==========================================
    #[test]
    fn test_edit_request_cycle() {
        let (_temp_file, state) = create_test_state();
        let lot_id = received_lot(&state);

        // RECEIVED 状态可直接修改
        let mut input = sheet_lot_input();
        input.quantity = 4.5;
        let updated = state
            .lot_api
            .update_lot_details(&lot_id, input, "wh_user", ActorRole::Warehouse)
            .unwrap();
        assert_eq!(updated.quantity, 4.5);
        assert_eq!(updated.revision, 1);

        step(&state, &lot_id, LotStatus::PendingQc, "wh_user", ActorRole::Warehouse);

        let locked = state.lot_api.update_lot_details(
            &lot_id,
            sheet_lot_input(),
            "wh_user",
            ActorRole::Warehouse,
        );
        assert!(matches!(locked, Err(ApiError::BusinessRuleViolation(_))));

        // 申请修改必须说明原因
        let no_comment = state
            .lot_api
            .request_edit(&lot_id, "wh_user", ActorRole::Warehouse, "   ")
            .unwrap();
        assert_eq!(no_comment.error_kind, Some(TransitionErrorKind::GuardFailed));

        let requested = state
            .lot_api
            .request_edit(&lot_id, "wh_user", ActorRole::Warehouse, "熔炼号录错")
            .unwrap();
        assert!(requested.success, "{}", requested.message);

        let lot = state.lot_api.get_lot(&lot_id).unwrap();
        assert!(lot.edit_requested);
        assert_eq!(lot.edit_comment.as_deref(), Some("熔炼号录错"));

        step(&state, &lot_id, LotStatus::Received, "qc_user", ActorRole::Qc);

        let mut fixed = sheet_lot_input();
        fixed.melt_number = Some("M-33817".to_string());
        let unlocked = state
            .lot_api
            .update_lot_details(&lot_id, fixed, "wh_user", ActorRole::Warehouse)
            .unwrap();
        assert_eq!(unlocked.melt_number.as_deref(), Some("M-33817"));
        assert!(!unlocked.edit_requested);

        println!("✅ 修改申请与解锁测试通过");
    }

    // ==========================================
    // 测试4: 拒收与删除
    // ==========================================
    #[test]
    fn test_reject_and_retire() {
        let (_temp_file, state) = create_test_state();
        let lot_id = received_lot(&state);
        step(&state, &lot_id, LotStatus::PendingQc, "wh_user", ActorRole::Warehouse);

        let not_terminal = state
            .lot_api
            .retire_lot(&lot_id, "root", ActorRole::Admin, "重复登记");
        assert!(matches!(not_terminal, Err(ApiError::BusinessRuleViolation(_))));

        // 质检不合格并记录缺陷
        state
            .inspection_api
            .record_inspection(
                &lot_id,
                NewInspection {
                    defects: InspectionDefects {
                        surface_cracks: true,
                        ..Default::default()
                    },
                    ..Default::default()
                },
                "qc_user",
                ActorRole::Qc,
            )
            .unwrap();
        step(&state, &lot_id, LotStatus::QcFailed, "qc_user", ActorRole::Qc);
        step(&state, &lot_id, LotStatus::Rejected, "qc_user", ActorRole::Qc);

        let by_qc = state
            .lot_api
            .retire_lot(&lot_id, "qc_user", ActorRole::Qc, "拒收退货");
        assert!(matches!(by_qc, Err(ApiError::Forbidden(_))));

        let no_reason = state.lot_api.retire_lot(&lot_id, "root", ActorRole::Admin, "");
        assert!(matches!(no_reason, Err(ApiError::InvalidInput(_))));

        state
            .lot_api
            .retire_lot(&lot_id, "root", ActorRole::Admin, "拒收退货")
            .unwrap();

        assert!(matches!(state.lot_api.get_lot(&lot_id), Err(ApiError::NotFound(_))));
        assert!(state.lot_api.list_lots(None, false).unwrap().is_empty());
        assert_eq!(state.lot_api.list_lots(None, true).unwrap().len(), 1);

        // 已删除批次不可再流转
        let outcome = state
            .workflow_api
            .transition(&lot_id, LotStatus::Received, "root", ActorRole::Admin, None)
            .unwrap();
        assert_eq!(outcome.error_kind, Some(TransitionErrorKind::NotFound));

        println!("✅ 拒收与删除测试通过");
    }

    // ==========================================
    // 测试5: 状态目录与过滤
    // ==========================================
    #[test]
    fn test_status_catalogue_and_filters() {
        let (_temp_file, state) = create_test_state();
        let first = received_lot(&state);
        let _second = received_lot(&state);
        step(&state, &first, LotStatus::PendingQc, "wh_user", ActorRole::Warehouse);

        let pending = state
            .lot_api
            .list_lots(Some(LotStatus::PendingQc), false)
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].lot_id, first);

        let catalogue = state.workflow_api.status_catalogue();
        assert_eq!(catalogue.len(), LotStatus::ALL.len());
        let testing: Vec<_> = catalogue.iter().filter(|s| s.is_testing).collect();
        assert_eq!(testing.len(), 5);
        assert!(catalogue
            .iter()
            .filter(|s| s.is_terminal)
            .all(|s| matches!(s.status, LotStatus::Rejected | LotStatus::Archived)));
    }

    // ==========================================
    // 测试6: 取样标记各自独立落库
    // ==========================================
    #[test]
    fn test_sample_flags_logged_separately() {
        let (_temp_file, state) = create_test_state();
        let lot_id = received_lot(&state);
        step(&state, &lot_id, LotStatus::PendingQc, "wh_user", ActorRole::Warehouse);
        state
            .inspection_api
            .record_inspection(
                &lot_id,
                NewInspection {
                    requires_lab_verification: true,
                    ..Default::default()
                },
                "qc_user",
                ActorRole::Qc,
            )
            .unwrap();
        step(&state, &lot_id, LotStatus::LabCheckPending, "qc_user", ActorRole::Qc);

        let request = state
            .sample_api
            .create_sample_request(&lot_id, sample_input(), "lab_user", ActorRole::Lab)
            .unwrap();

        // 取样只设置取样标记
        let collected = state
            .sample_api
            .mark_collected(&request.request_id, "wh_user", ActorRole::Warehouse)
            .unwrap();
        assert!(collected.is_collected);
        assert!(collected.collected_at.is_some());
        assert!(!collected.is_sent_to_lab);
        assert!(collected.sent_at.is_none());

        let history = state.workflow_api.lot_history(&lot_id).unwrap();
        assert_eq!(history[0].action_type, "MarkSampleCollected");

        // 重复取样被拒绝，送检标记不受影响
        let again = state
            .sample_api
            .mark_collected(&request.request_id, "wh_user", ActorRole::Warehouse);
        assert!(matches!(again, Err(ApiError::BusinessRuleViolation(_))));
        let stored = state.sample_api.list_for_lot(&lot_id).unwrap();
        assert!(!stored[0].is_sent_to_lab);

        let sent = state
            .sample_api
            .mark_sent_to_lab(&request.request_id, "lab_user", ActorRole::Lab)
            .unwrap();
        assert!(sent.is_collected);
        assert!(sent.is_sent_to_lab);

        let history = state.workflow_api.lot_history(&lot_id).unwrap();
        assert_eq!(history[0].action_type, "MarkSampleSent");
        let flag_logs: Vec<_> = history
            .iter()
            .filter(|log| log.action_type.starts_with("MarkSample"))
            .collect();
        assert_eq!(flag_logs.len(), 2);
    }
}
