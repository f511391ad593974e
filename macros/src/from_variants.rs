use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields};

pub fn derive_from_variants_on(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(en) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "only enums are supported",
        ));
    };

    let enum_ident = &input.ident;

    // Two variants wrapping the same type would produce conflicting impls.
    let mut seen: Vec<String> = Vec::new();
    let mut impls = Vec::new();
    for variant in &en.variants {
        let variant_ident = &variant.ident;
        let Fields::Unnamed(fields) = &variant.fields else {
            continue;
        };
        if fields.unnamed.len() != 1 {
            continue;
        }
        let Field { ty, .. } = &fields.unnamed[0];
        let key = quote!(#ty).to_string();
        if seen.contains(&key) {
            return Err(syn::Error::new_spanned(
                ty,
                "type is wrapped by more than one variant",
            ));
        }
        seen.push(key);
        impls.push(quote! {
            impl From<#ty> for #enum_ident {
                fn from(value: #ty) -> Self {
                    Self::#variant_ident(value)
                }
            }
        });
    }

    Ok(quote! {
        #(#impls)*
    })
}
