use crate::derive_utils::merge_required_derives;
use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use syn::spanned::Spanned;
use syn::{
    Expr, Ident, Item, LitStr, Token, parse::Parse, parse::ParseStream, parse_macro_input,
    punctuated::Punctuated,
};

/// 事件标签，对应 `::modkit_domain::event::EventKind` 的变体
#[derive(Clone, Copy)]
pub(crate) enum Kind {
    Command,
    Domain,
    Integration,
}

impl Kind {
    fn variant(self) -> proc_macro2::TokenStream {
        match self {
            Kind::Command => quote!(::modkit_domain::event::EventKind::Command),
            Kind::Domain => quote!(::modkit_domain::event::EventKind::Domain),
            Kind::Integration => quote!(::modkit_domain::event::EventKind::Integration),
        }
    }

    fn attr_name(self) -> &'static str {
        match self {
            Kind::Command => "command",
            Kind::Domain => "domain_event",
            Kind::Integration => "integration_event",
        }
    }
}

/// 属性参数：`name = "notes.create"`（可省略，默认为类型名的 snake_case）
#[derive(Default)]
struct PayloadAttr {
    name: Option<LitStr>,
}

impl Parse for PayloadAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut cfg = PayloadAttr::default();
        let args = Punctuated::<syn::MetaNameValue, Token![,]>::parse_terminated(input)?;

        for arg in args {
            let key = arg
                .path
                .get_ident()
                .map(Ident::to_string)
                .unwrap_or_default();
            match (key.as_str(), &arg.value) {
                ("name", Expr::Lit(lit)) => match &lit.lit {
                    syn::Lit::Str(s) if cfg.name.is_none() => cfg.name = Some(s.clone()),
                    syn::Lit::Str(_) => {
                        return Err(syn::Error::new(arg.span(), "duplicate `name`"));
                    }
                    other => {
                        return Err(syn::Error::new(other.span(), "`name` expects a string"));
                    }
                },
                _ => {
                    return Err(syn::Error::new(
                        arg.path.span(),
                        format!("unsupported argument `{}`", arg.path.to_token_stream()),
                    ));
                }
            }
        }

        Ok(cfg)
    }
}

pub(crate) fn expand(kind: Kind, attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as PayloadAttr);
    let mut input = parse_macro_input!(item as Item);

    let (attrs, ident, generics) = match &mut input {
        Item::Struct(s) => (&mut s.attrs, s.ident.clone(), s.generics.clone()),
        Item::Enum(e) => (&mut e.attrs, e.ident.clone(), e.generics.clone()),
        other => {
            return syn::Error::new(
                other.span(),
                format!("#[{}] only on struct or enum", kind.attr_name()),
            )
            .to_compile_error()
            .into();
        }
    };

    let required = [
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    merge_required_derives(attrs, &required);

    let name = cfg
        .name
        .map(|lit| lit.value())
        .unwrap_or_else(|| snake_case(&ident.to_string()));
    let kind_variant = kind.variant();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics ::modkit_domain::event::EventPayload for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            const KIND: ::modkit_domain::event::EventKind = #kind_variant;
        }
    };

    TokenStream::from(expanded)
}

fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, ch) in ident.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
