//! The named-call JSON surface.
//!
//! Every call takes a camelCase argument object and answers with an object:
//!
//! ```text
//! {"success": true, ...payload}
//! {"success": false, "error": "SX_ERR_300: Insufficient credits: need 30, have 10"}
//! ```
//!
//! Nothing here panics or throws on bad input; malformed arguments, unknown
//! methods, and rejected calls all come back as `success: false`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use skillswap_types::{
    AdminActionId, BlobRef, Credits, DisputeId, ExchangeError, FraudAlertId, MatchId,
    NegotiationId, NegotiationResponse, NewRequest, ReportId, ReportTarget, RequestId, Result,
    Role, SkillLevel, Terms, TransactionId, UserId,
};

use crate::disputes::DisputeResolution;
use crate::engine::Exchange;
use crate::fraud::FraudResolution;
use crate::reports::ReportResolution;

/// One line of the JSON-lines protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// Echoed back on the response when present.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

// ---------------------------------------------------------------------------
// Argument records
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    session_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequestArgs {
    session_token: String,
    #[serde(flatten)]
    request: NewRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestArgs {
    session_token: String,
    request_id: RequestId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchArgs {
    session_token: String,
    match_id: MatchId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferArgs {
    session_token: String,
    match_id: MatchId,
    terms: Terms,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RespondArgs {
    session_token: String,
    negotiation_id: NegotiationId,
    #[serde(flatten)]
    response: NegotiationResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionArgs {
    session_token: String,
    transaction_id: TransactionId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterArgs {
    session_token: String,
    transaction_id: TransactionId,
    terms: Terms,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComplaintArgs {
    session_token: String,
    transaction_id: TransactionId,
    reason: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    evidence: Option<BlobRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveDisputeArgs {
    session_token: String,
    dispute_id: DisputeId,
    resolution: DisputeResolution,
    #[serde(default)]
    note: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileReportArgs {
    session_token: String,
    target: ReportTarget,
    reason: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportArgs {
    session_token: String,
    report_id: ReportId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReportArgs {
    session_token: String,
    report_id: ReportId,
    #[serde(flatten)]
    resolution: ReportResolution,
    #[serde(default)]
    note: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveFraudArgs {
    session_token: String,
    alert_id: FraudAlertId,
    #[serde(flatten)]
    resolution: FraudResolution,
    #[serde(default)]
    note: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserArgs {
    session_token: String,
    user_id: UserId,
    #[serde(default)]
    note: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuspendArgs {
    session_token: String,
    user_id: UserId,
    days: u32,
    reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UndoArgs {
    session_token: String,
    action_id: AdminActionId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdjustArgs {
    session_token: String,
    user_id: UserId,
    amount: Credits,
    reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingArgs {
    session_token: String,
    transaction_id: TransactionId,
    score: u8,
    #[serde(default)]
    comment: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterUserArgs {
    display_name: String,
    #[serde(default = "default_role")]
    role: Role,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterSkillArgs {
    user_id: UserId,
    name: String,
    level: SkillLevel,
    #[serde(default)]
    endorsements: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueSessionArgs {
    user_id: UserId,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run a named call and wrap its outcome.
pub fn dispatch(exchange: &Exchange, method: &str, params: Value) -> Value {
    match call(exchange, method, params) {
        Ok(payload) => success(payload),
        Err(err) => {
            tracing::debug!(method, error = %err, "call failed");
            json!({ "success": false, "error": err.to_string() })
        }
    }
}

/// Handle one JSON-lines request and render the response line.
pub fn handle_line(exchange: &Exchange, line: &str) -> String {
    let mut response = match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) => {
            let mut response = dispatch(exchange, &request.method, request.params);
            if let (Some(id), Some(obj)) = (request.id, response.as_object_mut()) {
                obj.insert("id".into(), id);
            }
            response
        }
        Err(err) => json!({
            "success": false,
            "error": ExchangeError::Serialization(err.to_string()).to_string(),
        }),
    };
    if let Some(obj) = response.as_object_mut() {
        obj.entry("success").or_insert(Value::Bool(false));
    }
    response.to_string()
}

fn success(payload: Value) -> Value {
    let mut obj = match payload {
        Value::Object(obj) => obj,
        Value::Null => Map::new(),
        other => {
            let mut obj = Map::new();
            obj.insert("result".into(), other);
            obj
        }
    };
    obj.insert("success".into(), Value::Bool(true));
    Value::Object(obj)
}

fn args<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|e| ExchangeError::validation(format!("invalid arguments: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[allow(clippy::too_many_lines)]
fn call(ex: &Exchange, method: &str, params: Value) -> Result<Value> {
    match method {
        // --- provisioning ---
        "registerUser" => {
            let a: RegisterUserArgs = args(params)?;
            Ok(json!({ "userId": ex.register_user(&a.display_name, a.role)? }))
        }
        "registerSkill" => {
            let a: RegisterSkillArgs = args(params)?;
            let id = ex.register_skill(a.user_id, &a.name, a.level, a.endorsements)?;
            Ok(json!({ "skillId": id }))
        }
        "issueSession" => {
            let a: IssueSessionArgs = args(params)?;
            Ok(json!({ "sessionToken": ex.issue_session(a.user_id)? }))
        }

        // --- accounts ---
        "getProfile" => {
            let a: Session = args(params)?;
            Ok(json!({ "profile": ex.profile(&a.session_token)? }))
        }
        "getBalance" => {
            let a: Session = args(params)?;
            Ok(json!({ "credits": ex.balance(&a.session_token)? }))
        }
        "getCreditHistory" => {
            let a: Session = args(params)?;
            Ok(json!({ "history": ex.credit_history(&a.session_token)? }))
        }

        // --- requests and matching ---
        "createRequest" => {
            let a: CreateRequestArgs = args(params)?;
            Ok(json!({ "requestId": ex.create_request(&a.session_token, &a.request)? }))
        }
        "viewRequest" => {
            let a: RequestArgs = args(params)?;
            to_json(&ex.view_request(&a.session_token, a.request_id)?)
        }
        "cancelRequest" => {
            let a: RequestArgs = args(params)?;
            ex.cancel_request(&a.session_token, a.request_id)?;
            Ok(Value::Null)
        }
        "acceptMatch" => {
            let a: MatchArgs = args(params)?;
            Ok(json!({ "transactionId": ex.accept_match(&a.session_token, a.match_id)? }))
        }
        "rejectMatch" => {
            let a: MatchArgs = args(params)?;
            ex.reject_match(&a.session_token, a.match_id)?;
            Ok(Value::Null)
        }
        "findNewMatchesForOpenRequests" => {
            Ok(json!({ "created": ex.find_new_matches_for_open_requests()? }))
        }

        // --- negotiation ---
        "sendNegotiation" => {
            let a: OfferArgs = args(params)?;
            let id = ex.send_negotiation(&a.session_token, a.match_id, a.terms, a.message)?;
            Ok(json!({ "negotiationId": id }))
        }
        "sendRequesterCounterOffer" => {
            let a: OfferArgs = args(params)?;
            let id =
                ex.send_requester_counter_offer(&a.session_token, a.match_id, a.terms, a.message)?;
            Ok(json!({ "negotiationId": id }))
        }
        "sendProviderCounterOffer" => {
            let a: OfferArgs = args(params)?;
            let id =
                ex.send_provider_counter_offer(&a.session_token, a.match_id, a.terms, a.message)?;
            Ok(json!({ "negotiationId": id }))
        }
        "respondToNegotiation" => {
            let a: RespondArgs = args(params)?;
            to_json(&ex.respond_to_negotiation(&a.session_token, a.negotiation_id, a.response)?)
        }
        "getNegotiations" => {
            let a: MatchArgs = args(params)?;
            Ok(json!({ "negotiations": ex.negotiations_for_match(&a.session_token, a.match_id)? }))
        }

        // --- transactions ---
        "getTransaction" => {
            let a: TransactionArgs = args(params)?;
            Ok(json!({ "transaction": ex.transaction(&a.session_token, a.transaction_id)? }))
        }
        "startTransaction" => {
            let a: TransactionArgs = args(params)?;
            ex.start_transaction(&a.session_token, a.transaction_id)?;
            Ok(Value::Null)
        }
        "confirmCompletion" => {
            let a: TransactionArgs = args(params)?;
            let status = ex.confirm_completion(&a.session_token, a.transaction_id)?;
            Ok(json!({ "status": status }))
        }
        "cancelTransaction" => {
            let a: TransactionArgs = args(params)?;
            ex.cancel_transaction(&a.session_token, a.transaction_id)?;
            Ok(Value::Null)
        }
        "rejectTransaction" => {
            let a: TransactionArgs = args(params)?;
            ex.reject_transaction(&a.session_token, a.transaction_id)?;
            Ok(Value::Null)
        }
        "providerCounterOffer" => {
            let a: CounterArgs = args(params)?;
            let id =
                ex.provider_counter_offer(&a.session_token, a.transaction_id, a.terms, a.message)?;
            Ok(json!({ "negotiationId": id }))
        }
        "reportRequestFromTransaction" => {
            let a: ComplaintArgs = args(params)?;
            let id = ex.report_request_from_transaction(
                &a.session_token,
                a.transaction_id,
                &a.reason,
                &a.description,
            )?;
            Ok(json!({ "reportId": id }))
        }

        // --- disputes, reports, ratings ---
        "openDispute" => {
            let a: ComplaintArgs = args(params)?;
            let id =
                ex.open_dispute(&a.session_token, a.transaction_id, &a.reason, &a.description)?;
            Ok(json!({ "disputeId": id }))
        }
        "reportDispute" => {
            let a: ComplaintArgs = args(params)?;
            let evidence = a
                .evidence
                .ok_or_else(|| ExchangeError::validation("evidence is required"))?;
            let id = ex.report_dispute(
                &a.session_token,
                a.transaction_id,
                &a.reason,
                &a.description,
                evidence,
            )?;
            Ok(json!({ "disputeId": id }))
        }
        "fileReport" => {
            let a: FileReportArgs = args(params)?;
            let id = ex.file_report(&a.session_token, a.target, &a.reason, &a.description)?;
            Ok(json!({ "reportId": id }))
        }
        "submitRating" => {
            let a: RatingArgs = args(params)?;
            let id = ex.submit_rating(&a.session_token, a.transaction_id, a.score, &a.comment)?;
            Ok(json!({ "ratingId": id }))
        }
        "getUserRatings" => {
            let a: UserArgs = args(params)?;
            Ok(json!({ "ratings": ex.user_ratings(&a.session_token, a.user_id)? }))
        }

        // --- admin ---
        "reviewReport" => {
            let a: ReportArgs = args(params)?;
            ex.review_report(&a.session_token, a.report_id)?;
            Ok(Value::Null)
        }
        "resolveReport" => {
            let a: ResolveReportArgs = args(params)?;
            let status = ex.resolve_report(&a.session_token, a.report_id, a.resolution, &a.note)?;
            Ok(json!({ "status": status }))
        }
        "resolveDispute" => {
            let a: ResolveDisputeArgs = args(params)?;
            let status =
                ex.resolve_dispute(&a.session_token, a.dispute_id, a.resolution, &a.note)?;
            Ok(json!({ "status": status }))
        }
        "resolveFraudAlert" => {
            let a: ResolveFraudArgs = args(params)?;
            let status =
                ex.resolve_fraud_alert(&a.session_token, a.alert_id, a.resolution, &a.note)?;
            Ok(json!({ "status": status }))
        }
        "suspendUser" => {
            let a: SuspendArgs = args(params)?;
            let until = ex.suspend_user(&a.session_token, a.user_id, a.days, &a.reason)?;
            Ok(json!({ "suspendedUntil": until }))
        }
        "pardonUser" => {
            let a: UserArgs = args(params)?;
            ex.pardon_user(&a.session_token, a.user_id, &a.note)?;
            Ok(Value::Null)
        }
        "toggleUserStatus" => {
            let a: UserArgs = args(params)?;
            Ok(json!({ "isActive": ex.toggle_user_status(&a.session_token, a.user_id)? }))
        }
        "undoAdminAction" => {
            let a: UndoArgs = args(params)?;
            Ok(json!({ "actionId": ex.undo_admin_action(&a.session_token, a.action_id)? }))
        }
        "adjustCredits" => {
            let a: AdjustArgs = args(params)?;
            let balance = ex.adjust_credits(&a.session_token, a.user_id, a.amount, &a.reason)?;
            Ok(json!({ "credits": balance }))
        }
        "getAdminQueue" => {
            let a: Session = args(params)?;
            to_json(&ex.admin_queue(&a.session_token)?)
        }
        "getAdminActions" => {
            let a: Session = args(params)?;
            Ok(json!({ "actions": ex.admin_actions(&a.session_token)? }))
        }
        "detectAbnormalCreditActivity" => {
            Ok(json!({ "alerts": ex.detect_abnormal_credit_activity()? }))
        }

        other => Err(ExchangeError::validation(format!("unknown method: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use skillswap_types::{ExchangeConfig, ExchangeMode, NewRequest, Role, SkillLevel};

    use super::*;

    #[test]
    fn unknown_method_fails_closed() {
        let ex = Exchange::new(ExchangeConfig::default());
        let out = dispatch(&ex, "dropTables", Value::Null);
        assert_eq!(out["success"], false);
        assert!(out["error"].as_str().unwrap().contains("unknown method"));
    }

    #[test]
    fn bad_session_is_an_error_payload() {
        let ex = Exchange::new(ExchangeConfig::default());
        let out = dispatch(&ex, "getBalance", json!({ "sessionToken": "nope" }));
        assert_eq!(out["success"], false);
        assert!(out["error"].as_str().unwrap().starts_with("SX_ERR_100"));
    }

    #[test]
    fn malformed_line_still_answers() {
        let ex = Exchange::new(ExchangeConfig::default());
        let out: Value = serde_json::from_str(&handle_line(&ex, "{not json")).unwrap();
        assert_eq!(out["success"], false);
    }

    #[test]
    fn id_is_echoed_and_payload_flattened() {
        let ex = Exchange::new(ExchangeConfig::default());
        let line = json!({
            "id": 7,
            "method": "registerUser",
            "params": { "displayName": "ana" }
        })
        .to_string();
        let out: Value = serde_json::from_str(&handle_line(&ex, &line)).unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["id"], 7);
        assert!(out["userId"].is_string());
    }

    #[test]
    fn resolution_is_read_from_the_action_tag() {
        let a: ResolveReportArgs = serde_json::from_value(json!({
            "sessionToken": "t",
            "reportId": ReportId::new(),
            "action": "resolve",
            "suspendDays": 3,
        }))
        .unwrap();
        assert_eq!(
            a.resolution,
            ReportResolution::Resolve {
                suspend_days: Some(3)
            }
        );
    }

    #[test]
    fn records_answer_with_camel_case_keys() {
        let ex = Exchange::new(ExchangeConfig::default());
        let ana = ex.register_user("ana", Role::User).unwrap();
        let token = ex.issue_session(ana).unwrap();
        let ben = ex.register_user("ben", Role::User).unwrap();
        ex.register_skill(ben, "design", SkillLevel::Expert, 0).unwrap();
        let request = ex
            .create_request(
                &token,
                &NewRequest {
                    title: "Logo".into(),
                    description: String::new(),
                    skill_needed: "Design".into(),
                    exchange_mode: ExchangeMode::Credit,
                    credit_amount: Some(10),
                    skill_offered: None,
                },
            )
            .unwrap();

        let out = dispatch(
            &ex,
            "viewRequest",
            json!({ "sessionToken": token, "requestId": request }),
        );
        assert_eq!(out["success"], true);
        assert_eq!(out["request"]["requesterId"], json!(ana));
        assert_eq!(out["request"]["skillNeeded"], "design");
        assert_eq!(out["request"]["isReported"], false);
        assert!(out["request"].get("requester_id").is_none());
        assert_eq!(out["matches"][0]["providerId"], json!(ben));
        assert_eq!(out["matches"][0]["matchScore"], 90);
    }
}
