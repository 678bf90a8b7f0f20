use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemStruct, LitStr};

use crate::schema_extraction::{doc_text, field_docs, parse_args, require_named_fields};

pub fn completion_schema(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match parse_args(attr) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let item_struct = parse_macro_input!(item as ItemStruct);

    if let Err(err) = require_named_fields(&item_struct) {
        return err.to_compile_error().into();
    }

    if !item_struct.generics.params.is_empty() {
        return syn::Error::new(
            item_struct.generics.span(),
            "`#[completion_schema]` cannot be applied to generic structs",
        )
        .to_compile_error()
        .into();
    }

    let ident = &item_struct.ident;
    let type_name = LitStr::new(&ident.to_string(), Span::call_site());
    let schema_name = args.name.unwrap_or_else(|| type_name.clone());

    let description = match args
        .description
        .or_else(|| doc_text(&item_struct.attrs).map(|doc| LitStr::new(&doc, Span::call_site())))
    {
        Some(lit) => quote! { Some(#lit) },
        None => quote! { None },
    };

    let docs = field_docs(&item_struct).into_iter().map(|(field, doc)| {
        let field = LitStr::new(&field, Span::call_site());
        let doc = LitStr::new(&doc, Span::call_site());
        quote! { (#field, #doc) }
    });

    let expanded = quote! {
        #item_struct

        impl investor_crawler::schema::CompletionSchema for #ident {
            fn schema() -> &'static investor_crawler::schema::SchemaHandle {
                static HANDLE: std::sync::OnceLock<investor_crawler::schema::SchemaHandle> =
                    std::sync::OnceLock::new();
                HANDLE.get_or_init(|| {
                    let mut root = schemars::gen::SchemaSettings::draft07()
                        .with(|settings| settings.inline_subschemas = true)
                        .into_generator()
                        .into_root_schema_for::<Self>();
                    investor_crawler::schema::apply_doc_comments(
                        &mut root,
                        #schema_name,
                        #description,
                        &[#(#docs),*],
                    );
                    investor_crawler::schema::SchemaHandle::from_root_schema::<Self>(
                        #schema_name,
                        #type_name,
                        root,
                    )
                })
            }
        }
    };

    expanded.into()
}
