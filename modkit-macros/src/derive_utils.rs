use quote::ToTokens;
use std::collections::HashSet;
use syn::{Attribute, Path, Token, punctuated::Punctuated};

/// 将载荷类型所需的派生合并进已有的 `#[derive(...)]`
///
/// 所有 derive 属性折叠为一条并置于最前，其余属性（如 `#[serde(...)]`）
/// 保持原有相对顺序；`Serialize` 与 `serde::Serialize` 视为同一项。
pub(crate) fn merge_required_derives(attrs: &mut Vec<Attribute>, required: &[Path]) {
    let mut others = Vec::with_capacity(attrs.len());
    let mut declared = Vec::new();

    for attr in attrs.drain(..) {
        if !attr.path().is_ident("derive") {
            others.push(attr);
            continue;
        }
        match attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) {
            Ok(list) => declared.extend(list),
            Err(_) => others.push(attr),
        }
    }

    let mut seen = HashSet::new();
    let merged: Vec<Path> = required
        .iter()
        .cloned()
        .chain(declared)
        .filter(|p| seen.insert(normalized(p)))
        .collect();

    attrs.push(syn::parse_quote!(#[derive(#(#merged),*)]));
    attrs.extend(others);
}

fn normalized(path: &Path) -> String {
    match path.segments.last() {
        Some(seg) => seg.ident.to_string(),
        None => path.to_token_stream().to_string(),
    }
}
