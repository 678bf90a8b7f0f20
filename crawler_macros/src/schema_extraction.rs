use syn::{
    parse::Parser, punctuated::Punctuated, spanned::Spanned, Attribute, Expr, ExprLit, Fields,
    ItemStruct, Lit, LitStr, MetaNameValue, Token,
};

/// `#[completion_schema(name = "...", description = "...")]`
#[derive(Default)]
pub struct SchemaArgs {
    pub name: Option<LitStr>,
    pub description: Option<LitStr>,
}

pub fn parse_args(attr: proc_macro::TokenStream) -> syn::Result<SchemaArgs> {
    let mut args = SchemaArgs::default();
    if attr.is_empty() {
        return Ok(args);
    }

    let pairs = Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr)?;

    for pair in pairs {
        let key = pair
            .path
            .get_ident()
            .ok_or_else(|| syn::Error::new_spanned(&pair.path, "expected an identifier"))?;

        let Expr::Lit(ExprLit {
            lit: Lit::Str(value),
            ..
        }) = &pair.value
        else {
            return Err(syn::Error::new_spanned(
                &pair.value,
                "expected a string literal",
            ));
        };

        let slot = match key.to_string().as_str() {
            "name" => &mut args.name,
            "description" => &mut args.description,
            other => {
                return Err(syn::Error::new(
                    key.span(),
                    format!("unknown argument `{other}`"),
                ))
            }
        };

        if slot.replace(value.clone()).is_some() {
            return Err(syn::Error::new(
                key.span(),
                format!("`{key}` given more than once"),
            ));
        }
    }

    Ok(args)
}

pub fn require_named_fields(item: &ItemStruct) -> syn::Result<()> {
    match &item.fields {
        Fields::Named(_) => Ok(()),
        _ => Err(syn::Error::new(
            item.struct_token.span(),
            "`#[completion_schema]` needs a struct with named fields",
        )),
    }
}

/// Joined `///` lines, or `None` when the item is undocumented.
pub fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(MetaNameValue {
                value:
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(lit), ..
                    }),
                ..
            }) => Some(lit.value().trim().to_string()),
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Field docs keyed by the serialized field name (`#[serde(rename)]` honoured).
pub fn field_docs(item: &ItemStruct) -> Vec<(String, String)> {
    let Fields::Named(fields) = &item.fields else {
        return Vec::new();
    };

    fields
        .named
        .iter()
        .filter_map(|field| {
            let ident = field.ident.as_ref()?;
            let doc = doc_text(&field.attrs)?;
            let name = serde_rename(&field.attrs).unwrap_or_else(|| ident.to_string());
            Some((name, doc))
        })
        .collect()
}

fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    let mut renamed = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                renamed = Some(value.value());
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        });
    }
    renamed
}
