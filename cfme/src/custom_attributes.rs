//! Custom attributes REST suite: add, edit and delete attributes on
//! providers, instances and VMs, and check the server's answers.

use miqapi::api::{
    CustomAttribute, CustomAttributeEdit, CustomAttributeFields, CustomAttributesApi, Resource,
    ResourceApi, Section,
};
use miqapi::Client;
use std::fmt;

use crate::assertions::{
    assert_action_success, delete_resources_from_collection, ensure, expect_api_error,
    BAD_REQUEST, NOT_FOUND,
};
use crate::cleanup::{Cleanup, CleanupTask};
use crate::config::WaitConfig;
use crate::error::{CaseError, CaseResult};
use crate::gating::{
    blocked_by, uncollect, uncollect_detail_delete, Blocker, CollectionName, ProviderKind,
    SkipReason,
};
use crate::generators::gen_alphanumeric;
use crate::version::Version;

/// Attributes created by every case
pub const ATTRS_NUM: usize = 2;

const BAD_SECTION: &str = "bad_section";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseKind {
    Add,
    DeleteFromDetailPost,
    DeleteFromDetailDelete,
    DeleteFromCollection,
    DeleteSingleFromCollection,
    Edit,
    BadSectionEdit,
    BadSectionAdd,
}

impl CaseKind {
    pub const ALL: [CaseKind; 8] = [
        CaseKind::Add,
        CaseKind::DeleteFromDetailPost,
        CaseKind::DeleteFromDetailDelete,
        CaseKind::DeleteFromCollection,
        CaseKind::DeleteSingleFromCollection,
        CaseKind::Edit,
        CaseKind::BadSectionEdit,
        CaseKind::BadSectionAdd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CaseKind::Add => "test_add",
            CaseKind::DeleteFromDetailPost => "test_delete_from_detail_post",
            CaseKind::DeleteFromDetailDelete => "test_delete_from_detail_delete",
            CaseKind::DeleteFromCollection => "test_delete_from_collection",
            CaseKind::DeleteSingleFromCollection => "test_delete_single_from_collection",
            CaseKind::Edit => "test_edit",
            CaseKind::BadSectionEdit => "test_bad_section_edit",
            CaseKind::BadSectionAdd => "test_bad_section_add",
        }
    }

    /// Cases run once through the detail endpoint and once through the collection
    pub fn has_detail_variants(&self) -> bool {
        matches!(self, CaseKind::Edit | CaseKind::BadSectionEdit)
    }
}

/// One parametrized case, e.g. `test_edit[vms-from_collection]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaseId {
    pub kind: CaseKind,
    pub collection: CollectionName,
    pub from_detail: Option<bool>,
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}", self.kind.name(), self.collection)?;
        match self.from_detail {
            Some(true) => write!(f, "-from_detail]"),
            Some(false) => write!(f, "-from_collection]"),
            None => write!(f, "]"),
        }
    }
}

/// The full parameter matrix, before gating
pub fn matrix() -> Vec<CaseId> {
    let mut cases = Vec::new();
    for kind in CaseKind::ALL {
        for collection in CollectionName::ALL {
            if kind.has_detail_variants() {
                for from_detail in [true, false] {
                    cases.push(CaseId {
                        kind,
                        collection,
                        from_detail: Some(from_detail),
                    });
                }
            } else {
                cases.push(CaseId {
                    kind,
                    collection,
                    from_detail: None,
                });
            }
        }
    }
    cases
}

/// Gating applied to `case` before any fixture is built
pub fn skip_reason(
    case: &CaseId,
    version: &Version,
    provider: ProviderKind,
    blockers: &[Blocker],
) -> Option<SkipReason> {
    let gated = match case.kind {
        CaseKind::DeleteFromDetailDelete => {
            uncollect_detail_delete(version, provider, case.collection)
        }
        _ => uncollect(version, provider, case.collection),
    };
    gated.or_else(|| {
        blocked_by(blockers, version, case.kind.name(), case.collection)
            .map(|b| SkipReason::Blocked { id: b.id })
    })
}

/// Everything a case body needs
pub struct CaseContext<'a> {
    pub client: &'a Client,
    pub resource: &'a Resource,
    pub waits: &'a WaitConfig,
    pub cleanup: &'a mut Cleanup,
}

impl<'a> CaseContext<'a> {
    fn attributes(&self) -> CustomAttributesApi<'a> {
        ResourceApi::new(self.client, &self.resource.href).custom_attributes()
    }
}

fn random_fields() -> CustomAttributeFields {
    let uid = gen_alphanumeric(5);
    CustomAttributeFields::new(format!("ca_name_{}", uid), format!("ca_value_{}", uid))
}

/// Adds `ATTRS_NUM` uniquely named attributes to the context resource in one
/// batched call and registers their removal.
pub async fn add_custom_attributes(ctx: &mut CaseContext<'_>) -> CaseResult<Vec<CustomAttribute>> {
    let body: Vec<CustomAttributeFields> = (0..ATTRS_NUM).map(|_| random_fields()).collect();
    let attrs = ctx.attributes().add(&body).await?;

    let ids = attrs
        .iter()
        .filter_map(|a| a.record_id().map(str::to_string))
        .collect::<Vec<_>>();
    let without_id = attrs.len() - ids.len();
    ctx.cleanup.register(CleanupTask::DeleteCustomAttributes {
        parent: ctx.resource.clone(),
        ids,
    });

    ensure(attrs.len() == ATTRS_NUM, || {
        format!("expected {} attributes, got {}", ATTRS_NUM, attrs.len())
    })?;
    ensure(without_id == 0, || {
        format!("{} added attributes came back without an id", without_id)
    })?;
    Ok(attrs)
}

pub async fn run_case(case: &CaseId, ctx: &mut CaseContext<'_>) -> CaseResult {
    match case.kind {
        CaseKind::Add => test_add(ctx).await,
        CaseKind::DeleteFromDetailPost => test_delete_from_detail(ctx, DeleteVerb::Post).await,
        CaseKind::DeleteFromDetailDelete => test_delete_from_detail(ctx, DeleteVerb::Delete).await,
        CaseKind::DeleteFromCollection => test_delete_from_collection(ctx).await,
        CaseKind::DeleteSingleFromCollection => test_delete_single_from_collection(ctx).await,
        CaseKind::Edit => test_edit(ctx, case.from_detail.unwrap_or(true)).await,
        CaseKind::BadSectionEdit => {
            test_bad_section_edit(ctx, case.from_detail.unwrap_or(true)).await
        }
        CaseKind::BadSectionAdd => test_bad_section_add(ctx).await,
    }
}

fn record_id(attr: &CustomAttribute) -> CaseResult<&str> {
    attr.record_id().ok_or_else(|| {
        CaseError::Assertion(format!("attribute `{}` was returned without an id", attr.name))
    })
}

async fn test_add(ctx: &mut CaseContext<'_>) -> CaseResult {
    let attributes = add_custom_attributes(ctx).await?;
    let api = ctx.attributes();
    for attr in &attributes {
        let record = api.get(record_id(attr)?).await?;
        ensure(record.name == attr.name, || {
            format!("name `{}` != `{}`", record.name, attr.name)
        })?;
        ensure(record.value == attr.value, || {
            format!("value `{}` != `{}`", record.value, attr.value)
        })?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum DeleteVerb {
    Post,
    Delete,
}

async fn test_delete_from_detail(ctx: &mut CaseContext<'_>, verb: DeleteVerb) -> CaseResult {
    let attributes = add_custom_attributes(ctx).await?;
    let api = ctx.attributes();
    for attr in &attributes {
        let detail = api.attribute(attr)?;
        match verb {
            DeleteVerb::Post => {
                assert_action_success(&detail.delete_post().await?)?;
                expect_api_error(detail.delete_post().await, 404, NOT_FOUND)?;
            }
            DeleteVerb::Delete => {
                detail.delete().await?;
                expect_api_error(detail.delete().await, 404, NOT_FOUND)?;
            }
        }
    }
    Ok(())
}

async fn test_delete_from_collection(ctx: &mut CaseContext<'_>) -> CaseResult {
    let attributes = add_custom_attributes(ctx).await?;
    delete_resources_from_collection(&ctx.attributes(), &attributes, true, ctx.waits).await
}

async fn test_delete_single_from_collection(ctx: &mut CaseContext<'_>) -> CaseResult {
    let attributes = add_custom_attributes(ctx).await?;
    let api = ctx.attributes();
    delete_resources_from_collection(&api, &attributes[..1], true, ctx.waits).await?;

    for attr in &attributes[1..] {
        let record = api.get(record_id(attr)?).await?;
        ensure(record.name == attr.name, || {
            format!("untouched attribute `{}` changed to `{}`", attr.name, record.name)
        })?;
    }
    Ok(())
}

async fn test_edit(ctx: &mut CaseContext<'_>, from_detail: bool) -> CaseResult {
    let attributes = add_custom_attributes(ctx).await?;
    let api = ctx.attributes();
    let body: Vec<CustomAttributeFields> = attributes
        .iter()
        .map(|_| random_fields().with_section(Section::Metadata))
        .collect();

    let edited = if from_detail {
        let mut edited = Vec::with_capacity(attributes.len());
        for (attr, fields) in attributes.iter().zip(&body) {
            edited.push(api.attribute(attr)?.edit(fields).await?);
        }
        edited
    } else {
        let edits = attributes
            .iter()
            .zip(&body)
            .map(|(attr, fields)| {
                Ok::<_, CaseError>(CustomAttributeEdit {
                    href: api.attribute_href(attr)?,
                    fields: fields.clone(),
                })
            })
            .collect::<CaseResult<Vec<_>>>()?;
        api.edit(&edits).await?
    };

    ensure(edited.len() == attributes.len(), || {
        format!("expected {} edited attributes, got {}", attributes.len(), edited.len())
    })?;

    for ((attr, fields), edited) in attributes.iter().zip(&body).zip(&edited) {
        let reloaded = api.attribute(attr)?.get().await?;
        for (label, sent, answered, stored) in [
            (
                "name",
                fields.name.as_deref(),
                Some(edited.name.as_str()),
                Some(reloaded.name.as_str()),
            ),
            (
                "value",
                fields.value.as_deref(),
                Some(edited.value.as_str()),
                Some(reloaded.value.as_str()),
            ),
            (
                "section",
                fields.section.as_ref().map(Section::as_str),
                edited.section.as_ref().map(Section::as_str),
                reloaded.section.as_ref().map(Section::as_str),
            ),
        ] {
            ensure(sent == answered && answered == stored, || {
                format!(
                    "{} mismatch: sent {:?}, edit answered {:?}, reload shows {:?}",
                    label, sent, answered, stored
                )
            })?;
        }
    }
    Ok(())
}

/// Re-reads `attributes` so a rejected call can be shown to have changed nothing
async fn snapshot(
    api: &CustomAttributesApi<'_>,
    attributes: &[CustomAttribute],
) -> CaseResult<Vec<CustomAttribute>> {
    let mut records = Vec::with_capacity(attributes.len());
    for attr in attributes {
        records.push(api.attribute(attr)?.get().await?);
    }
    Ok(records)
}

fn ensure_unchanged(before: &[CustomAttribute], after: &[CustomAttribute]) -> CaseResult {
    for (b, a) in before.iter().zip(after) {
        ensure(
            b.name == a.name && b.value == a.value && b.section == a.section,
            || format!("rejected edit still changed `{}`: {:?} -> {:?}", b.name, b, a),
        )?;
    }
    Ok(())
}

async fn test_bad_section_edit(ctx: &mut CaseContext<'_>, from_detail: bool) -> CaseResult {
    let attributes = add_custom_attributes(ctx).await?;
    let api = ctx.attributes();
    let before = snapshot(&api, &attributes).await?;
    let fields = CustomAttributeFields::section_only(Section::Other(BAD_SECTION.to_string()));

    if from_detail {
        for attr in &attributes {
            expect_api_error(api.attribute(attr)?.edit(&fields).await, 400, BAD_REQUEST)?;
        }
    } else {
        let edits = attributes
            .iter()
            .map(|attr| {
                Ok::<_, CaseError>(CustomAttributeEdit {
                    href: api.attribute_href(attr)?,
                    fields: fields.clone(),
                })
            })
            .collect::<CaseResult<Vec<_>>>()?;
        expect_api_error(api.edit(&edits).await, 400, BAD_REQUEST)?;
    }

    let after = snapshot(&api, &attributes).await?;
    ensure_unchanged(&before, &after)
}

async fn test_bad_section_add(ctx: &mut CaseContext<'_>) -> CaseResult {
    // the resource carries attributes already, as in every other case
    add_custom_attributes(ctx).await?;
    let api = ctx.attributes();
    let fields = random_fields().with_section(Section::Other(BAD_SECTION.to_string()));

    expect_api_error(api.add(std::slice::from_ref(&fields)).await, 400, BAD_REQUEST)?;

    let name = fields.name.as_deref().unwrap_or_default();
    let existing = api.list().await?;
    ensure(existing.iter().all(|a| a.name != name), || {
        format!("rejected attribute `{}` was created anyway", name)
    })
}
