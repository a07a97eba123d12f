//! End-to-end scenarios driving the full engine over in-memory fakes:
//! classification, resolution, fan-out, aggregation, and rendering.

mod common;

use common::*;
use ethers::types::Address;
use serde_json::Value;
use upgradeguard_engine::proxy::{
    ADMIN_SLOT, BEACON_SLOT, IMPLEMENTATION_SLOT, PROXIABLE_UUID_SELECTOR,
};
use upgradeguard_engine::{
    AnalysisRequest, AnalyzerStatus, EngineError, EngineResult, Severity, UpgradeEngine, Verdict,
};

const PROXY: Address = Address::repeat_byte(0x11);
const IMPL: Address = Address::repeat_byte(0x22);
const ADMIN: Address = Address::repeat_byte(0x33);

fn uups_chain() -> MockChain {
    let mut code = vec![0x60, 0x80, 0x60, 0x40];
    code.extend_from_slice(&PROXIABLE_UUID_SELECTOR);
    MockChain::default()
        .with_slot(PROXY, IMPLEMENTATION_SLOT, word_for(IMPL))
        .with_code(IMPL, code)
}

fn transparent_chain() -> MockChain {
    MockChain::default()
        .with_slot(PROXY, IMPLEMENTATION_SLOT, word_for(IMPL))
        .with_slot(PROXY, ADMIN_SLOT, word_for(ADMIN))
        .with_code(IMPL, vec![0x60, 0x80, 0x60, 0x40])
}

async fn analyze(
    chain: MockChain,
    old: (Value, Value, Value),
    new: (Value, Value, Value),
) -> (EngineResult, Project) {
    let project = project("OldImpl.sol", "NewImpl.sol");
    let oracle = MockOracle::default()
        .with_contract("OldImpl.sol", "OldImpl", old.0, old.1, old.2)
        .with_contract("NewImpl.sol", "NewImpl", new.0, new.1, new.2);
    let engine = UpgradeEngine::new(Box::new(oracle), Box::new(chain));
    let request = AnalysisRequest {
        proxy_address: format!("{PROXY:?}"),
        old_implementation: project.old_path.clone(),
        new_implementation: project.new_path.clone(),
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_name: None,
    };
    let result = engine.analyze(&request).await.expect("analysis should run");
    (result, project)
}

fn codes(result: &EngineResult) -> Vec<&str> {
    result.findings.iter().map(|f| f.code.as_str()).collect()
}

fn assert_completed(result: &EngineResult, name: &str) {
    assert_eq!(
        result.analyzer_status.get(name),
        Some(&AnalyzerStatus::Completed),
        "{name} should be completed"
    );
}

#[tokio::test]
async fn safe_append_is_review_required() {
    let old_layout = layout_json("OldImpl", &[(0, 0, "uint256", "value")]);
    let new_layout = layout_json(
        "NewImpl",
        &[(0, 0, "uint256", "value"), (1, 0, "address", "owner")],
    );
    let (result, _project) = analyze(
        uups_chain(),
        (old_layout, balance_of_abi(), healthy_ast("OldImpl")),
        (new_layout, balance_of_abi(), healthy_ast("NewImpl")),
    )
    .await;

    assert_eq!(codes(&result), vec!["STOR-009"]);
    assert_eq!(result.verdict, Verdict::ReviewRequired);
    assert_eq!(result.highest_severity, Some(Severity::Medium));
    assert_eq!(result.exit_code(), 3);
    for name in ["proxy-detection", "storage-layout", "abi-diff", "uups-safety", "initializer-integrity", "access-control-regression"] {
        assert_completed(&result, name);
    }
    assert_eq!(
        result.analyzer_status.get("transparent-safety"),
        Some(&AnalyzerStatus::Skipped {
            reason: "proxy-type-is-uups".to_string()
        })
    );
}

#[tokio::test]
async fn deleted_variable_is_unsafe_exit_1() {
    let old_layout = layout_json(
        "OldImpl",
        &[(0, 0, "uint256", "value"), (1, 0, "address", "owner")],
    );
    let new_layout = layout_json("NewImpl", &[(0, 0, "uint256", "value")]);
    let (result, _project) = analyze(
        uups_chain(),
        (old_layout, balance_of_abi(), healthy_ast("OldImpl")),
        (new_layout, balance_of_abi(), healthy_ast("NewImpl")),
    )
    .await;

    assert_eq!(codes(&result), vec!["STOR-001"]);
    assert_eq!(result.findings[0].severity, Severity::Critical);
    assert_eq!(result.verdict, Verdict::Unsafe);
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn mid_layout_insertion_is_unsafe_exit_1() {
    let old_layout = layout_json(
        "OldImpl",
        &[(0, 0, "uint256", "a"), (2, 0, "uint256", "b")],
    );
    let new_layout = layout_json(
        "NewImpl",
        &[
            (0, 0, "uint256", "a"),
            (1, 0, "uint256", "inserted"),
            (2, 0, "uint256", "b"),
        ],
    );
    let (result, _project) = analyze(
        uups_chain(),
        (old_layout, balance_of_abi(), healthy_ast("OldImpl")),
        (new_layout, balance_of_abi(), healthy_ast("NewImpl")),
    )
    .await;

    assert_eq!(codes(&result), vec!["STOR-002"]);
    assert_eq!(result.verdict, Verdict::Unsafe);
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn unguarded_uups_hook_is_unsafe_exit_1() {
    let unguarded = |contract: &str| {
        ast_json(
            contract,
            vec![
                AstFunction::regular("initialize", "external")
                    .with_modifiers(vec!["initializer"])
                    .with_statements(vec![noop_statement()]),
                AstFunction::regular("_authorizeUpgrade", "internal")
                    .with_statements(vec![noop_statement()]),
            ],
        )
    };
    let layout = layout_json("OldImpl", &[(0, 0, "uint256", "value")]);
    let (result, _project) = analyze(
        uups_chain(),
        (layout.clone(), balance_of_abi(), unguarded("OldImpl")),
        (layout, balance_of_abi(), unguarded("NewImpl")),
    )
    .await;

    assert_eq!(codes(&result), vec!["UUPS-003"]);
    assert_eq!(result.findings[0].severity, Severity::Critical);
    assert_eq!(result.verdict, Verdict::Unsafe);
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn dropped_only_owner_is_unsafe_exit_1() {
    let admin_action_abi = serde_json::json!([{
        "type": "function",
        "name": "adminAction",
        "inputs": [],
        "outputs": [],
        "stateMutability": "nonpayable"
    }]);
    let old_ast = ast_json(
        "OldImpl",
        vec![
            AstFunction::regular("initialize", "external")
                .with_modifiers(vec!["initializer"])
                .with_statements(vec![noop_statement()]),
            AstFunction::regular("adminAction", "public")
                .with_modifiers(vec!["onlyOwner"])
                .with_statements(vec![noop_statement()]),
        ],
    );
    let new_ast = ast_json(
        "NewImpl",
        vec![
            AstFunction::regular("initialize", "external")
                .with_modifiers(vec!["initializer"])
                .with_statements(vec![noop_statement()]),
            AstFunction::regular("adminAction", "public")
                .with_statements(vec![noop_statement()]),
        ],
    );
    let layout = layout_json("OldImpl", &[(0, 0, "uint256", "value")]);
    let (result, _project) = analyze(
        transparent_chain(),
        (layout.clone(), admin_action_abi.clone(), old_ast),
        (layout, admin_action_abi, new_ast),
    )
    .await;

    assert_eq!(codes(&result), vec!["ACL-001"]);
    assert_eq!(result.findings[0].severity, Severity::Critical);
    assert_eq!(result.verdict, Verdict::Unsafe);
    assert_eq!(result.exit_code(), 1);
    assert_eq!(
        result.analyzer_status.get("uups-safety"),
        Some(&AnalyzerStatus::Skipped {
            reason: "proxy-type-is-transparent".to_string()
        })
    );
}

#[tokio::test]
async fn beacon_proxy_gates_everything_exit_4() {
    let chain = MockChain::default()
        .with_slot(PROXY, BEACON_SLOT, word_for(Address::repeat_byte(0x44)));
    let oracle = MockOracle::default();
    let engine = UpgradeEngine::new(Box::new(oracle), Box::new(chain));
    let request = AnalysisRequest {
        proxy_address: format!("{PROXY:?}"),
        old_implementation: "unused/Old.sol".into(),
        new_implementation: "unused/New.sol".into(),
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_name: None,
    };
    let result = engine.analyze(&request).await.unwrap();

    assert_eq!(codes(&result), vec!["PROXY-001"]);
    assert_eq!(result.verdict, Verdict::Incomplete);
    assert_eq!(result.highest_severity, None);
    assert_eq!(result.exit_code(), 4);
    assert_eq!(result.analyzer_status.len(), 7);
    let skipped = result
        .analyzer_status
        .iter()
        .filter(|(name, status)| {
            *name != "proxy-detection"
                && **status
                    == AnalyzerStatus::Skipped {
                        reason: "proxy-detection-failed".to_string(),
                    }
        })
        .count();
    assert_eq!(skipped, 6);
}

#[tokio::test]
async fn empty_implementation_slot_gates_everything() {
    let chain = MockChain::default();
    let engine = UpgradeEngine::new(Box::new(MockOracle::default()), Box::new(chain));
    let request = AnalysisRequest {
        proxy_address: format!("{PROXY:?}"),
        old_implementation: "unused/Old.sol".into(),
        new_implementation: "unused/New.sol".into(),
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_name: None,
    };
    let result = engine.analyze(&request).await.unwrap();
    assert_eq!(codes(&result), vec!["PROXY-002"]);
    assert_eq!(result.verdict, Verdict::Incomplete);
}

#[tokio::test]
async fn zero_admin_transparent_proxy_reaches_transparent_analyzer() {
    // Neither UUPS selector nor admin set, but the proxy bytecode
    // embeds the admin slot constant: classified transparent so the
    // zero admin is reported as a finding instead of dying upstream.
    let mut proxy_code = vec![0x60, 0x80];
    proxy_code.extend_from_slice(ADMIN_SLOT.as_bytes());
    let chain = MockChain::default()
        .with_slot(PROXY, IMPLEMENTATION_SLOT, word_for(IMPL))
        .with_code(IMPL, vec![0x60, 0x80, 0x60, 0x40])
        .with_code(PROXY, proxy_code);

    let layout = layout_json("OldImpl", &[(0, 0, "uint256", "value")]);
    let (result, _project) = analyze(
        chain,
        (layout.clone(), balance_of_abi(), healthy_ast("OldImpl")),
        (layout, balance_of_abi(), healthy_ast("NewImpl")),
    )
    .await;

    assert!(codes(&result).contains(&"TPROXY-001"));
    assert_eq!(result.verdict, Verdict::Unsafe);
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn undetermined_pattern_is_blocking() {
    let chain = MockChain::default()
        .with_slot(PROXY, IMPLEMENTATION_SLOT, word_for(IMPL))
        .with_code(IMPL, vec![0x60, 0x80, 0x60, 0x40])
        .with_code(PROXY, vec![0x60, 0x80]);
    let engine = UpgradeEngine::new(Box::new(MockOracle::default()), Box::new(chain));
    let request = AnalysisRequest {
        proxy_address: format!("{PROXY:?}"),
        old_implementation: "unused/Old.sol".into(),
        new_implementation: "unused/New.sol".into(),
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_name: None,
    };
    let result = engine.analyze(&request).await.unwrap();
    assert_eq!(codes(&result), vec!["PROXY-005"]);
    assert_eq!(result.verdict, Verdict::Incomplete);
}

#[tokio::test]
async fn identical_inputs_render_identical_reports() {
    let run = || async {
        let old_layout = layout_json(
            "OldImpl",
            &[(0, 0, "uint256", "value"), (1, 0, "address", "owner")],
        );
        let new_layout = layout_json("NewImpl", &[(0, 0, "uint256", "value")]);
        let (result, _project) = analyze(
            uups_chain(),
            (old_layout, balance_of_abi(), healthy_ast("OldImpl")),
            (new_layout, balance_of_abi(), healthy_ast("NewImpl")),
        )
        .await;
        result
    };
    let first = run().await;
    let second = run().await;
    assert_eq!(first.report_markdown, second.report_markdown);
    assert_eq!(
        serde_json::to_string(&first.findings).unwrap(),
        serde_json::to_string(&second.findings).unwrap()
    );
}

#[tokio::test]
async fn malformed_proxy_address_is_input_invalid() {
    let engine = UpgradeEngine::new(Box::new(MockOracle::default()), Box::new(MockChain::default()));
    let request = AnalysisRequest {
        proxy_address: "not-an-address".to_string(),
        old_implementation: "unused/Old.sol".into(),
        new_implementation: "unused/New.sol".into(),
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_name: None,
    };
    match engine.analyze(&request).await {
        Err(EngineError::InputInvalid(_)) => {}
        other => panic!("expected InputInvalid, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_source_file_is_input_invalid() {
    let engine = UpgradeEngine::new(Box::new(MockOracle::default()), Box::new(uups_chain()));
    let request = AnalysisRequest {
        proxy_address: format!("{PROXY:?}"),
        old_implementation: "/definitely/missing/Old.sol".into(),
        new_implementation: "/definitely/missing/New.sol".into(),
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_name: None,
    };
    match engine.analyze(&request).await {
        Err(EngineError::InputInvalid(_)) => {}
        other => panic!("expected InputInvalid, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_contract_file_without_name_is_ambiguous() {
    let project = project("OldImpl.sol", "NewImpl.sol");
    let layout = layout_json("OldImpl", &[(0, 0, "uint256", "value")]);
    let oracle = MockOracle::default()
        .with_contract(
            "OldImpl.sol",
            "OldImpl",
            layout.clone(),
            balance_of_abi(),
            healthy_ast("OldImpl"),
        )
        .with_contract(
            "OldImpl.sol",
            "Helper",
            layout.clone(),
            balance_of_abi(),
            healthy_ast("Helper"),
        )
        .with_contract(
            "NewImpl.sol",
            "NewImpl",
            layout,
            balance_of_abi(),
            healthy_ast("NewImpl"),
        );
    let engine = UpgradeEngine::new(Box::new(oracle), Box::new(uups_chain()));
    let request = AnalysisRequest {
        proxy_address: format!("{PROXY:?}"),
        old_implementation: project.old_path.clone(),
        new_implementation: project.new_path.clone(),
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_name: None,
    };
    match engine.analyze(&request).await {
        Err(EngineError::ContractAmbiguous(_)) => {}
        other => panic!("expected ContractAmbiguous, got {other:?}"),
    }
}

#[tokio::test]
async fn status_map_always_has_seven_keys_with_one_active_branch() {
    let layout = layout_json("OldImpl", &[(0, 0, "uint256", "value")]);
    let (result, _project) = analyze(
        transparent_chain(),
        (layout.clone(), balance_of_abi(), healthy_ast("OldImpl")),
        (layout, balance_of_abi(), healthy_ast("NewImpl")),
    )
    .await;

    assert_eq!(result.analyzer_status.len(), 7);
    let uups = result.analyzer_status.get("uups-safety").unwrap();
    let transparent = result.analyzer_status.get("transparent-safety").unwrap();
    assert!(transparent.is_completed());
    assert!(!uups.is_completed());
}
