//! Ledger request kinds and their builder calls.
use crate::error::Result;
use crate::request::Request;
use chrono::{NaiveTime, Utc};
use std::ffi::CString;
use std::fmt;
use std::str::FromStr;
use vdrkit_ffi::encode::encode_str;
use vdrkit_ffi::{Bridge, BuilderCall, JsonInput};

/// Sub-ledger indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LedgerType {
    Pool = 0,
    Domain = 1,
    Config = 2,
}

impl From<LedgerType> for i32 {
    fn from(value: LedgerType) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for LedgerType {
    type Error = String;

    fn try_from(value: i32) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pool),
            1 => Ok(Self::Domain),
            2 => Ok(Self::Config),
            _ => Err(format!("unknown ledger type: {value}")),
        }
    }
}

impl FromStr for LedgerType {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<i32>() {
            return Self::try_from(value);
        }
        match s.to_ascii_uppercase().as_str() {
            "POOL" => Ok(Self::Pool),
            "DOMAIN" => Ok(Self::Domain),
            "CONFIG" => Ok(Self::Config),
            _ => Err(format!("unknown ledger type: {s}")),
        }
    }
}

impl fmt::Display for LedgerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool => write!(f, "POOL"),
            Self::Domain => write!(f, "DOMAIN"),
            Self::Config => write!(f, "CONFIG"),
        }
    }
}

/// Kinds of rich schema objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RichSchemaType {
    Context,
    Schema,
    Encoding,
    Mapping,
    CredDef,
    PresDef,
}

impl RichSchemaType {
    /// The ledger's short name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "ctx",
            Self::Schema => "sch",
            Self::Encoding => "enc",
            Self::Mapping => "map",
            Self::CredDef => "cdf",
            Self::PresDef => "pdf",
        }
    }
}

impl FromStr for RichSchemaType {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s {
            "ctx" => Ok(Self::Context),
            "sch" => Ok(Self::Schema),
            "enc" => Ok(Self::Encoding),
            "map" => Ok(Self::Mapping),
            "cdf" => Ok(Self::CredDef),
            "pdf" => Ok(Self::PresDef),
            _ => Err(format!("unknown rich schema type: {s}")),
        }
    }
}

impl fmt::Display for RichSchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every request the engine can prepare, with its parameters.
///
/// `submitter_did` is optional for reads; the engine substitutes a default identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// A complete request body supplied by the caller.
    Custom { body: JsonInput },
    GetTxn { submitter_did: Option<String>, ledger_type: LedgerType, seq_no: i32 },
    Nym {
        submitter_did: String,
        dest: String,
        verkey: Option<String>,
        alias: Option<String>,
        role: Option<String>,
        diddoc_content: Option<JsonInput>,
        version: Option<i32>,
    },
    GetNym {
        submitter_did: Option<String>,
        dest: String,
        seq_no: Option<i32>,
        timestamp: Option<i64>,
    },
    Attrib {
        submitter_did: String,
        target_did: String,
        hash: Option<String>,
        raw: Option<JsonInput>,
        enc: Option<String>,
    },
    GetAttrib {
        submitter_did: Option<String>,
        target_did: String,
        raw: Option<String>,
        hash: Option<String>,
        enc: Option<String>,
        seq_no: Option<i32>,
        timestamp: Option<i64>,
    },
    Schema { submitter_did: String, schema: JsonInput },
    GetSchema { submitter_did: Option<String>, schema_id: String },
    CredDef { submitter_did: String, cred_def: JsonInput },
    GetCredDef { submitter_did: Option<String>, cred_def_id: String },
    RevocRegDef { submitter_did: String, revoc_reg_def: JsonInput },
    GetRevocRegDef { submitter_did: Option<String>, revoc_reg_id: String },
    RevocRegEntry {
        submitter_did: String,
        revoc_reg_def_id: String,
        revoc_reg_def_type: String,
        deltas: JsonInput,
    },
    GetRevocReg { submitter_did: Option<String>, revoc_reg_id: String, timestamp: i64 },
    GetRevocRegDelta {
        submitter_did: Option<String>,
        revoc_reg_id: String,
        from: Option<i64>,
        to: i64,
    },
    GetValidatorInfo { submitter_did: String },
    TxnAuthorAgreement {
        submitter_did: String,
        text: Option<String>,
        version: String,
        ratification_ts: Option<i64>,
        retirement_ts: Option<i64>,
    },
    GetTxnAuthorAgreement { submitter_did: Option<String>, data: Option<JsonInput> },
    DisableAllTxnAuthorAgreements { submitter_did: String },
    AcceptanceMechanisms {
        submitter_did: String,
        aml: JsonInput,
        version: String,
        aml_context: Option<String>,
    },
    GetAcceptanceMechanisms {
        submitter_did: Option<String>,
        timestamp: Option<i64>,
        version: Option<String>,
    },
    /// Requires an engine built with rich schema support.
    RichSchema {
        submitter_did: String,
        id: String,
        content: JsonInput,
        name: String,
        version: String,
        rs_type: RichSchemaType,
        ver: String,
    },
    GetRichSchemaObjectById { submitter_did: Option<String>, id: String },
    GetRichSchemaObjectByMetadata {
        submitter_did: Option<String>,
        rs_type: RichSchemaType,
        name: String,
        version: String,
    },
}

impl RequestKind {
    /// The native builder invocation preparing this request.
    pub fn builder_call(&self) -> Result<BuilderCall> {
        let call = match self {
            Self::Custom { body } => {
                BuilderCall::new("indy_vdr_build_custom_request").json(Some(body))?
            }
            Self::GetTxn { submitter_did, ledger_type, seq_no } => {
                BuilderCall::new("indy_vdr_build_get_txn_request")
                    .str(submitter_did.as_deref())?
                    .i32(Some((*ledger_type).into()))
                    .i32(Some(*seq_no))
            }
            Self::Nym { submitter_did, dest, verkey, alias, role, diddoc_content, version } => {
                BuilderCall::new("indy_vdr_build_nym_request")
                    .str(Some(submitter_did))?
                    .str(Some(dest))?
                    .str(verkey.as_deref())?
                    .str(alias.as_deref())?
                    .str(role.as_deref())?
                    .json(diddoc_content.as_ref())?
                    .i32(*version)
            }
            Self::GetNym { submitter_did, dest, seq_no, timestamp } => {
                BuilderCall::new("indy_vdr_build_get_nym_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(dest))?
                    .i32(*seq_no)
                    .i64(*timestamp)
            }
            Self::Attrib { submitter_did, target_did, hash, raw, enc } => {
                BuilderCall::new("indy_vdr_build_attrib_request")
                    .str(Some(submitter_did))?
                    .str(Some(target_did))?
                    .str(hash.as_deref())?
                    .json(raw.as_ref())?
                    .str(enc.as_deref())?
            }
            Self::GetAttrib { submitter_did, target_did, raw, hash, enc, seq_no, timestamp } => {
                BuilderCall::new("indy_vdr_build_get_attrib_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(target_did))?
                    .str(raw.as_deref())?
                    .str(hash.as_deref())?
                    .str(enc.as_deref())?
                    .i32(*seq_no)
                    .i64(*timestamp)
            }
            Self::Schema { submitter_did, schema } => {
                BuilderCall::new("indy_vdr_build_schema_request")
                    .str(Some(submitter_did))?
                    .json(Some(schema))?
            }
            Self::GetSchema { submitter_did, schema_id } => {
                BuilderCall::new("indy_vdr_build_get_schema_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(schema_id))?
            }
            Self::CredDef { submitter_did, cred_def } => {
                BuilderCall::new("indy_vdr_build_cred_def_request")
                    .str(Some(submitter_did))?
                    .json(Some(cred_def))?
            }
            Self::GetCredDef { submitter_did, cred_def_id } => {
                BuilderCall::new("indy_vdr_build_get_cred_def_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(cred_def_id))?
            }
            Self::RevocRegDef { submitter_did, revoc_reg_def } => {
                BuilderCall::new("indy_vdr_build_revoc_reg_def_request")
                    .str(Some(submitter_did))?
                    .json(Some(revoc_reg_def))?
            }
            Self::GetRevocRegDef { submitter_did, revoc_reg_id } => {
                BuilderCall::new("indy_vdr_build_get_revoc_reg_def_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(revoc_reg_id))?
            }
            Self::RevocRegEntry { submitter_did, revoc_reg_def_id, revoc_reg_def_type, deltas } => {
                BuilderCall::new("indy_vdr_build_revoc_reg_entry_request")
                    .str(Some(submitter_did))?
                    .str(Some(revoc_reg_def_id))?
                    .str(Some(revoc_reg_def_type))?
                    .json(Some(deltas))?
            }
            Self::GetRevocReg { submitter_did, revoc_reg_id, timestamp } => {
                BuilderCall::new("indy_vdr_build_get_revoc_reg_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(revoc_reg_id))?
                    .i64(Some(*timestamp))
            }
            Self::GetRevocRegDelta { submitter_did, revoc_reg_id, from, to } => {
                BuilderCall::new("indy_vdr_build_get_revoc_reg_delta_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(revoc_reg_id))?
                    .i64(*from)
                    .i64(Some(*to))
            }
            Self::GetValidatorInfo { submitter_did } => {
                BuilderCall::new("indy_vdr_build_get_validator_info_request")
                    .str(Some(submitter_did))?
            }
            Self::TxnAuthorAgreement {
                submitter_did,
                text,
                version,
                ratification_ts,
                retirement_ts,
            } => BuilderCall::new("indy_vdr_build_txn_author_agreement_request")
                .str(Some(submitter_did))?
                .str(text.as_deref())?
                .str(Some(version))?
                .i64(*ratification_ts)
                .i64(*retirement_ts),
            Self::GetTxnAuthorAgreement { submitter_did, data } => {
                BuilderCall::new("indy_vdr_build_get_txn_author_agreement_request")
                    .str(submitter_did.as_deref())?
                    .json(data.as_ref())?
            }
            Self::DisableAllTxnAuthorAgreements { submitter_did } => {
                BuilderCall::new("indy_vdr_build_disable_all_txn_author_agreements_request")
                    .str(Some(submitter_did))?
            }
            Self::AcceptanceMechanisms { submitter_did, aml, version, aml_context } => {
                BuilderCall::new("indy_vdr_build_acceptance_mechanisms_request")
                    .str(Some(submitter_did))?
                    .json(Some(aml))?
                    .str(Some(version))?
                    .str(aml_context.as_deref())?
            }
            Self::GetAcceptanceMechanisms { submitter_did, timestamp, version } => {
                BuilderCall::new("indy_vdr_build_get_acceptance_mechanisms_request")
                    .str(submitter_did.as_deref())?
                    .i64(*timestamp)
                    .str(version.as_deref())?
            }
            Self::RichSchema { submitter_did, id, content, name, version, rs_type, ver } => {
                BuilderCall::new("indy_vdr_build_rich_schema_request")
                    .str(Some(submitter_did))?
                    .str(Some(id))?
                    .json(Some(content))?
                    .str(Some(name))?
                    .str(Some(version))?
                    .str(Some(rs_type.as_str()))?
                    .str(Some(ver))?
            }
            Self::GetRichSchemaObjectById { submitter_did, id } => {
                BuilderCall::new("indy_vdr_build_get_rich_schema_object_by_id_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(id))?
            }
            Self::GetRichSchemaObjectByMetadata { submitter_did, rs_type, name, version } => {
                BuilderCall::new("indy_vdr_build_get_rich_schema_object_by_metadata_request")
                    .str(submitter_did.as_deref())?
                    .str(Some(rs_type.as_str()))?
                    .str(Some(name))?
                    .str(Some(version))?
            }
        };
        Ok(call)
    }
    /// Prepares this request through `bridge`.
    pub fn build(self, bridge: &Bridge) -> Result<Request> {
        Request::build(bridge, self)
    }
}

/// Parameters for [`prepare_txn_author_agreement_acceptance`].
///
/// Either `taa_digest`, or both `text` and `version`, must be given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaaAcceptance {
    pub text: Option<String>,
    pub version: Option<String>,
    pub taa_digest: Option<String>,
    /// The acceptance mechanism, from the ledger's acceptance mechanism list.
    pub mechanism: String,
    /// Acceptance time as a UTC timestamp. Defaults to the start of the current day.
    pub accepted_time: Option<u64>,
}

/// Prepares transaction author agreement acceptance data for
/// [`Request::set_txn_author_agreement_acceptance`].
pub fn prepare_txn_author_agreement_acceptance(
    bridge: &Bridge,
    acceptance: &TaaAcceptance,
) -> Result<String> {
    let text = encode_str(acceptance.text.as_deref())?;
    let version = encode_str(acceptance.version.as_deref())?;
    let taa_digest = encode_str(acceptance.taa_digest.as_deref())?;
    let mechanism = CString::new(acceptance.mechanism.as_str()).map_err(vdrkit_ffi::Error::from)?;
    let time = acceptance.accepted_time.unwrap_or_else(start_of_day);
    Ok(bridge.call_string(|lib, out| {
        lib.prepare_txn_author_agreement_acceptance(
            text.as_deref(),
            version.as_deref(),
            taa_digest.as_deref(),
            &mechanism,
            time,
            out,
        )
    })?)
}

fn start_of_day() -> u64 {
    let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    u64::try_from(midnight.timestamp()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use vdrkit_ffi::mock::MockEngine;
    use vdrkit_ffi::native::NativeArg;

    fn bridge() -> (Arc<MockEngine>, Bridge) {
        let engine = Arc::new(MockEngine::new());
        (engine.clone(), Bridge::new(engine))
    }

    #[test]
    fn ledger_type_parsing() {
        assert_eq!("domain".parse::<LedgerType>(), Ok(LedgerType::Domain));
        assert_eq!("CONFIG".parse::<LedgerType>(), Ok(LedgerType::Config));
        assert_eq!("0".parse::<LedgerType>(), Ok(LedgerType::Pool));
        assert!("7".parse::<LedgerType>().is_err());
        assert!("audit".parse::<LedgerType>().is_err());
        assert_eq!(i32::from(LedgerType::Domain), 1);
    }

    #[test]
    fn absent_numbers_use_sentinel() -> Result<()> {
        let call = RequestKind::GetRevocRegDelta {
            submitter_did: None,
            revoc_reg_id: String::from("L5wx9FUxCDpFJEdFc23jcn:4:L5wx9FUxCDpFJEdFc23jcn:3:CL:1954:default:CL_ACCUM:default"),
            from: None,
            to: 0,
        }
        .builder_call()?;
        assert_eq!(call.args[2], NativeArg::I64(-1));
        assert_eq!(call.args[3], NativeArg::I64(0));
        Ok(())
    }

    #[test]
    fn structured_parameters_are_serialized() -> Result<()> {
        let (engine, bridge) = bridge();
        let request = RequestKind::Schema {
            submitter_did: String::from("55GkHamhTU1ZbTbV2ab9DE"),
            schema: JsonInput::from(json!({
                "id": "55GkHamhTU1ZbTbV2ab9DE:2:schema:1.0",
                "name": "schema",
                "version": "1.0",
                "attrNames": ["first", "last"],
                "ver": "1.0",
            })),
        }
        .build(&bridge)?;
        let body = engine.request_body(request.handle().expect("handle")).expect("body");
        assert_eq!(body["operation"]["type"], "101");
        assert_eq!(body["operation"]["data"]["attrNames"], json!(["first", "last"]));
        assert_eq!(body["identifier"], "55GkHamhTU1ZbTbV2ab9DE");
        Ok(())
    }

    #[test]
    fn read_requests_with_optional_fields() -> Result<()> {
        let (_, bridge) = bridge();
        let request = RequestKind::GetAttrib {
            submitter_did: None,
            target_did: String::from("V4SGRU86Z58d6TV7PBUe6f"),
            raw: Some(String::from("endpoint")),
            hash: None,
            enc: None,
            seq_no: None,
            timestamp: Some(0),
        }
        .build(&bridge)?;
        let body = request.body_json()?;
        assert_eq!(
            body["operation"],
            json!({"type": "104", "dest": "V4SGRU86Z58d6TV7PBUe6f", "raw": "endpoint", "timestamp": 0})
        );
        Ok(())
    }

    #[test]
    fn every_kind_builds() -> Result<()> {
        let (engine, bridge) = bridge();
        let did = || String::from("V4SGRU86Z58d6TV7PBUe6f");
        let kinds = vec![
            RequestKind::Custom { body: JsonInput::from(r#"{"operation":{"type":"1"}}"#) },
            RequestKind::GetTxn { submitter_did: None, ledger_type: LedgerType::Domain, seq_no: 1 },
            RequestKind::Nym {
                submitter_did: did(),
                dest: did(),
                verkey: None,
                alias: None,
                role: Some(String::from("ENDORSER")),
                diddoc_content: None,
                version: None,
            },
            RequestKind::GetNym { submitter_did: None, dest: did(), seq_no: None, timestamp: None },
            RequestKind::Attrib {
                submitter_did: did(),
                target_did: did(),
                hash: None,
                raw: Some(JsonInput::from(json!({"endpoint": {"ha": "127.0.0.1:5555"}}))),
                enc: None,
            },
            RequestKind::GetSchema { submitter_did: None, schema_id: String::from("s") },
            RequestKind::CredDef { submitter_did: did(), cred_def: JsonInput::from("{}") },
            RequestKind::GetCredDef { submitter_did: None, cred_def_id: String::from("c") },
            RequestKind::RevocRegDef { submitter_did: did(), revoc_reg_def: JsonInput::from("{}") },
            RequestKind::GetRevocRegDef { submitter_did: None, revoc_reg_id: String::from("r") },
            RequestKind::RevocRegEntry {
                submitter_did: did(),
                revoc_reg_def_id: String::from("r"),
                revoc_reg_def_type: String::from("CL_ACCUM"),
                deltas: JsonInput::from("{}"),
            },
            RequestKind::GetRevocReg {
                submitter_did: None,
                revoc_reg_id: String::from("r"),
                timestamp: 1_600_000_000,
            },
            RequestKind::GetValidatorInfo { submitter_did: did() },
            RequestKind::TxnAuthorAgreement {
                submitter_did: did(),
                text: Some(String::from("text")),
                version: String::from("1.0"),
                ratification_ts: Some(1_600_000_000),
                retirement_ts: None,
            },
            RequestKind::GetTxnAuthorAgreement { submitter_did: None, data: None },
            RequestKind::DisableAllTxnAuthorAgreements { submitter_did: did() },
            RequestKind::AcceptanceMechanisms {
                submitter_did: did(),
                aml: JsonInput::from(json!({"on_file": "accepted on file"})),
                version: String::from("1.0"),
                aml_context: None,
            },
            RequestKind::GetAcceptanceMechanisms {
                submitter_did: None,
                timestamp: None,
                version: Some(String::from("1.0")),
            },
        ];
        let count = kinds.len();
        let requests = kinds.into_iter().map(|k| k.build(&bridge)).collect::<Result<Vec<_>>>()?;
        assert_eq!(engine.live_requests(), count);
        let types = requests
            .iter()
            .map(|r| Ok(r.body_json()?["operation"]["type"].clone()))
            .collect::<Result<Vec<Value>>>()?;
        assert_eq!(types[1], "3");
        assert_eq!(types[13], "4");
        drop(requests);
        assert_eq!(engine.live_requests(), 0);
        Ok(())
    }

    #[test]
    fn rich_schema_request() -> Result<()> {
        let (_, bridge) = bridge();
        let request = RequestKind::RichSchema {
            submitter_did: String::from("V4SGRU86Z58d6TV7PBUe6f"),
            id: String::from("did:sov:3x9F8ZmxuvDqRiqqY29x6dx9oU4qwFTkPbDpWtwGbdUsrCD"),
            content: JsonInput::from(json!({"@id": "did:sov:3x9F8ZmxuvDqRiqqY29x6dx9oU4qwFTkPbDpWtwGbdUsrCD"})),
            name: String::from("SomeRichSchema"),
            version: String::from("1.0"),
            rs_type: RichSchemaType::Schema,
            ver: String::from("1"),
        }
        .build(&bridge)?;
        let operation = &request.body_json()?["operation"];
        assert_eq!(operation["type"], "201");
        assert_eq!(operation["rsType"], "sch");
        assert_eq!(operation["rsName"], "SomeRichSchema");
        assert_eq!(
            operation["content"]["@id"],
            "did:sov:3x9F8ZmxuvDqRiqqY29x6dx9oU4qwFTkPbDpWtwGbdUsrCD"
        );
        Ok(())
    }

    #[test]
    fn rich_schema_context_type() -> Result<()> {
        let call = RequestKind::RichSchema {
            submitter_did: String::from("V4SGRU86Z58d6TV7PBUe6f"),
            id: String::from("did:sov:ctx"),
            content: JsonInput::from("{}"),
            name: String::from("ctx"),
            version: String::from("1.0"),
            rs_type: RichSchemaType::Context,
            ver: String::from("1"),
        }
        .builder_call()?;
        assert_eq!(call.args.len(), 7);
        assert_eq!(call.str_arg(5), Some("ctx"));
        assert_eq!("pdf".parse::<RichSchemaType>(), Ok(RichSchemaType::PresDef));
        assert!("xyz".parse::<RichSchemaType>().is_err());
        Ok(())
    }

    #[test]
    fn get_rich_schema_object_by_id() -> Result<()> {
        let (_, bridge) = bridge();
        let request = RequestKind::GetRichSchemaObjectById {
            submitter_did: None,
            id: String::from("did:sov:3x9F8ZmxuvDqRiqqY29x6dx9oU4qwFTkPbDpWtwGbdUsrCD"),
        }
        .build(&bridge)?;
        let body = request.body_json()?;
        assert_eq!(
            body["operation"],
            json!({"type": "300", "id": "did:sov:3x9F8ZmxuvDqRiqqY29x6dx9oU4qwFTkPbDpWtwGbdUsrCD"})
        );
        Ok(())
    }

    #[test]
    fn get_rich_schema_object_by_metadata() -> Result<()> {
        let (_, bridge) = bridge();
        let request = RequestKind::GetRichSchemaObjectByMetadata {
            submitter_did: Some(String::from("V4SGRU86Z58d6TV7PBUe6f")),
            rs_type: RichSchemaType::Mapping,
            name: String::from("SomeMapping"),
            version: String::from("1.0"),
        }
        .build(&bridge)?;
        let body = request.body_json()?;
        assert_eq!(body["identifier"], "V4SGRU86Z58d6TV7PBUe6f");
        assert_eq!(
            body["operation"],
            json!({"type": "301", "rsType": "map", "rsName": "SomeMapping", "rsVersion": "1.0"})
        );
        Ok(())
    }

    #[test]
    fn invalid_custom_body() {
        let (_, bridge) = bridge();
        let err = Request::custom(&bridge, "not json").expect_err("should fail");
        assert_eq!(err.code(), vdrkit_ffi::ErrorCode::Input);
    }

    #[test]
    fn taa_acceptance_from_text() -> Result<()> {
        let (_, bridge) = bridge();
        let acceptance = prepare_txn_author_agreement_acceptance(
            &bridge,
            &TaaAcceptance {
                text: Some(String::from("some agreement text")),
                version: Some(String::from("1.0.0")),
                mechanism: String::from("on_file"),
                accepted_time: Some(1_600_012_345),
                ..Default::default()
            },
        )?;
        let acceptance: Value = serde_json::from_str(&acceptance)?;
        assert_eq!(acceptance["mechanism"], "on_file");
        assert_eq!(acceptance["time"], 1_599_955_200u64);
        assert_eq!(acceptance["taaDigest"].as_str().map(str::len), Some(64));
        Ok(())
    }

    #[test]
    fn taa_acceptance_defaults_to_start_of_day() -> Result<()> {
        let (_, bridge) = bridge();
        let acceptance = prepare_txn_author_agreement_acceptance(
            &bridge,
            &TaaAcceptance {
                taa_digest: Some(String::from("abcdef")),
                mechanism: String::from("at_submission"),
                ..Default::default()
            },
        )?;
        let acceptance: Value = serde_json::from_str(&acceptance)?;
        assert_eq!(acceptance["time"].as_u64(), Some(start_of_day()));
        assert_eq!(start_of_day() % 86400, 0);
        Ok(())
    }

    #[test]
    fn taa_acceptance_requires_digest_or_text() {
        let (engine, bridge) = bridge();
        let err = prepare_txn_author_agreement_acceptance(
            &bridge,
            &TaaAcceptance { mechanism: String::from("on_file"), ..Default::default() },
        )
        .expect_err("should fail");
        assert_eq!(err.code(), vdrkit_ffi::ErrorCode::Input);
        assert_eq!(engine.live_strings(), 0);
    }
}
