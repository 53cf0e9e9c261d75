use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta, NestedMeta};


const QUOTED_TYPES: &[&str] = &["String", "str", "NaiveDate", "NaiveDateTime", "DateTime"];

#[proc_macro_derive(Entity, attributes(table, column, key))]
pub fn entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    TokenStream::from(entity_impl(input))
}

struct FieldType {
    is_option: bool,
    inner: syn::Type,
    is_string: bool,
    quoted: bool,
}

fn field_type(ty: &syn::Type) -> FieldType {
    let mut is_option = false;
    let mut inner = ty.clone();
    if let syn::Type::Path(tp) = ty {
        if tp.path.segments.len() == 1 && tp.path.segments[0].ident == "Option" {
            if let syn::PathArguments::AngleBracketed(args) = &tp.path.segments[0].arguments {
                if let Some(syn::GenericArgument::Type(t)) = args.args.first() {
                    is_option = true;
                    inner = t.clone();
                }
            }
        }
    }
    let last = match &inner {
        syn::Type::Path(tp) => tp.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    };
    let is_string = last.as_deref() == Some("String");
    let quoted = last.map_or(false, |l| QUOTED_TYPES.contains(&l.as_str()));
    FieldType {
        is_option,
        inner,
        is_string,
        quoted,
    }
}

fn lit_str(nv: &syn::MetaNameValue) -> Option<String> {
    match &nv.lit {
        Lit::Str(s) => Some(s.value()),
        _ => None,
    }
}

pub(crate) fn entity_impl(input: DeriveInput) -> proc_macro2::TokenStream {
    let struct_name = input.ident.clone();
    let struct_name_lit = struct_name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut table_name: Option<String> = None;
    for attr in &input.attrs {
        if attr.path.is_ident("table") {
            if let Ok(Meta::List(list)) = attr.parse_meta() {
                for nested in list.nested.iter() {
                    if let NestedMeta::Meta(Meta::NameValue(nv)) = nested {
                        if nv.path.is_ident("name") {
                            table_name = lit_str(nv);
                        }
                    }
                }
            }
        }
    }

    let fields_named = match input.data {
        Data::Struct(ds) => match ds.fields {
            Fields::Named(named) => named.named,
            _ => {
                return syn::Error::new_spanned(
                    &struct_name,
                    "Entity can only be derived for structs with named fields",
                )
                .to_compile_error()
            }
        },
        _ => {
            return syn::Error::new_spanned(&struct_name, "Entity can only be derived for structs")
                .to_compile_error()
        }
    };

    let mut field_defs = Vec::new();
    let mut values = Vec::new();
    let mut from_ms_fields = Vec::new();
    let mut from_pg_fields = Vec::new();
    let mut from_record_fields = Vec::new();

    for (idx, field) in fields_named.into_iter().enumerate() {
        let ident = match field.ident {
            Some(ident) => ident,
            None => continue,
        };
        let field_name = ident.to_string().trim_start_matches("r#").to_string();
        let ty = field_type(&field.ty);

        let mut column_name: Option<String> = None;
        let mut is_key = false;
        let mut insertable = true;

        for attr in field.attrs.iter() {
            if attr.path.is_ident("column") {
                if let Ok(Meta::List(list)) = attr.parse_meta() {
                    for nested in list.nested.iter() {
                        match nested {
                            NestedMeta::Meta(Meta::NameValue(nv)) => {
                                if nv.path.is_ident("name") {
                                    column_name = lit_str(nv);
                                } else if nv.path.is_ident("ignore_in_insert") {
                                    if let Lit::Bool(b) = &nv.lit {
                                        insertable = !b.value;
                                    }
                                }
                            }
                            NestedMeta::Meta(Meta::Path(p)) => {
                                if p.is_ident("identity") || p.is_ident("ignore_in_insert") {
                                    insertable = false;
                                }
                            }
                            _ => {}
                        }
                    }
                }
            } else if attr.path.is_ident("key") {
                is_key = true;
                if let Ok(Meta::List(list)) = attr.parse_meta() {
                    for nested in list.nested.iter() {
                        if let NestedMeta::Meta(Meta::NameValue(nv)) = nested {
                            if nv.path.is_ident("name") {
                                column_name = lit_str(nv);
                            }
                        }
                    }
                }
            }
        }

        let column_tokens = match column_name.as_ref() {
            Some(c) => quote! { ::std::option::Option::Some(#c) },
            None => quote! { ::std::option::Option::None },
        };
        let class_tokens = if ty.quoted {
            quote! { ::swift_catalog::query::ValueClass::Quoted }
        } else {
            quote! { ::swift_catalog::query::ValueClass::Bare }
        };
        field_defs.push(quote! {
            ::swift_catalog::mapping::FieldDef {
                name: #field_name,
                column: #column_tokens,
                class: #class_tokens,
                key: #is_key,
                insertable: #insertable,
            }
        });

        values.push(quote! {
            ::swift_catalog::query::ToParam::to_param(::std::clone::Clone::clone(&self.#ident))
        });

        let inner_ty = &ty.inner;
        let null_err = quote! {
            .ok_or_else(|| ::swift_catalog::__private::anyhow::anyhow!("column {} is null", cols[#idx]))?
        };
        from_ms_fields.push(match (ty.is_option, ty.is_string) {
            (true, true) => quote! {
                #ident: row.try_get::<&str, _>(cols[#idx])?.map(|v| v.to_string())
            },
            (false, true) => quote! {
                #ident: row.try_get::<&str, _>(cols[#idx])?.map(|v| v.to_string()) #null_err
            },
            (true, false) => quote! {
                #ident: row.try_get::<#inner_ty, _>(cols[#idx])?
            },
            (false, false) => quote! {
                #ident: row.try_get::<#inner_ty, _>(cols[#idx])? #null_err
            },
        });
        from_pg_fields.push(quote! { #ident: row.try_get(cols[#idx])? });
        from_record_fields.push(quote! { #ident: record.get(cols[#idx])? });
    }

    let table_tokens = match table_name.as_ref() {
        Some(t) => quote! { ::std::option::Option::Some(#t) },
        None => quote! { ::std::option::Option::None },
    };

    let column_names = quote! {
        let meta = <Self as ::swift_catalog::mapping::Entity>::table()?;
        let cols: ::std::vec::Vec<&str> = meta.columns.iter().map(|c| c.name.as_str()).collect();
    };

    quote! {
        impl #impl_generics ::swift_catalog::mapping::Entity for #struct_name #ty_generics #where_clause {
            const NAME: &'static str = #struct_name_lit;

            fn fields() -> &'static [::swift_catalog::mapping::FieldDef] {
                const FIELDS: &[::swift_catalog::mapping::FieldDef] = &[#(#field_defs),*];
                FIELDS
            }

            fn table() -> ::swift_catalog::error::Result<&'static ::swift_catalog::mapping::TableMeta> {
                static META: ::std::sync::OnceLock<
                    ::std::result::Result<::swift_catalog::mapping::TableMeta, ::std::string::String>,
                > = ::std::sync::OnceLock::new();
                ::swift_catalog::mapping::TableMeta::cached(&META, #struct_name_lit, #table_tokens, Self::fields())
            }

            fn values(&self) -> ::std::vec::Vec<::swift_catalog::query::SqlParam> {
                ::std::vec![#(#values),*]
            }
        }

        impl #impl_generics ::swift_catalog::mapping::FromRowNamed for #struct_name #ty_generics #where_clause {
            fn from_row_ms(row: &::swift_catalog::__private::tiberius::Row) -> ::swift_catalog::__private::anyhow::Result<Self> {
                #column_names
                Ok(Self { #(#from_ms_fields),* })
            }

            fn from_row_pg(row: &::swift_catalog::__private::tokio_postgres::Row) -> ::swift_catalog::__private::anyhow::Result<Self> {
                #column_names
                Ok(Self { #(#from_pg_fields),* })
            }

            fn from_record(record: &::swift_catalog::mapping::Record) -> ::swift_catalog::__private::anyhow::Result<Self> {
                #column_names
                Ok(Self { #(#from_record_fields),* })
            }
        }
    }
}
