use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse::ParseStream, parse_macro_input, ExprClosure, Ident, LitStr, Token, Type};

/// Input accepted by `tool!`:
///
/// ```ignore
/// tool!(
///     name = "fetch_page",
///     description = "...",
///     params = FetchPageParams,
///     |params: FetchPageParams| async move { ... }
/// );
/// ```
struct ToolDefinition {
    name: LitStr,
    description: LitStr,
    params_type: Type,
    handler: ExprClosure,
}

fn named_value<T: syn::parse::Parse>(input: ParseStream, keyword: &str) -> syn::Result<T> {
    let ident: Ident = input.parse()?;
    if ident != keyword {
        return Err(syn::Error::new_spanned(
            ident,
            format!("expected `{keyword} = ...`"),
        ));
    }
    input.parse::<Token![=]>()?;
    let value = input.parse::<T>()?;
    input.parse::<Token![,]>()?;
    Ok(value)
}

impl syn::parse::Parse for ToolDefinition {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(ToolDefinition {
            name: named_value(input, "name")?,
            description: named_value(input, "description")?,
            params_type: named_value(input, "params")?,
            handler: input.parse()?,
        })
    }
}

/// `fetch_page` -> `FetchPage`
fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn expand(input: TokenStream) -> TokenStream {
    let ToolDefinition {
        name,
        description,
        params_type,
        handler,
    } = parse_macro_input!(input as ToolDefinition);

    let name_value = name.value();
    if !name_value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return syn::Error::new(name.span(), "tool names must be snake_case")
            .to_compile_error()
            .into();
    }

    let tool_struct = format_ident!("{}Tool", pascal_case(&name_value));

    let expanded = quote! {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct #tool_struct;

        impl investor_crawler::tools::Tool for #tool_struct {
            fn name(&self) -> &'static str {
                #name
            }

            fn description(&self) -> &'static str {
                #description
            }

            fn parameters_schema(&self) -> serde_json::Value {
                let root = schemars::schema_for!(#params_type);
                serde_json::to_value(&root.schema).unwrap_or_else(|_| {
                    serde_json::json!({ "type": "object", "properties": {} })
                })
            }

            fn execute(
                &self,
                parameters: serde_json::Value,
            ) -> std::pin::Pin<
                Box<
                    dyn std::future::Future<
                            Output = investor_crawler::Result<serde_json::Value>,
                        > + Send
                        + '_,
                >,
            > {
                Box::pin(async move {
                    let params: #params_type = serde_path_to_error::deserialize(parameters)
                        .map_err(|err| {
                            investor_crawler::CrawlerError::ToolExecution(format!(
                                "invalid parameters for `{}` at {}: {}",
                                #name,
                                err.path(),
                                err.inner()
                            ))
                        })?;

                    let handler = #handler;
                    handler(params)
                        .await
                        .map_err(investor_crawler::CrawlerError::ToolExecution)
                })
            }
        }
    };

    TokenStream::from(expanded)
}
