/// Declares a group of command line flags.
///
/// Generates two structs from one declaration: `<Name>Cli`, which is a flattenable
/// `clap::Args`, and `<Name>Args`, a plain value with the same fields that library code
/// can build without going through clap. Every field gets a getter of the same name and
/// a `with_<field>` builder setter on the `Args` struct.
///
/// Extra clap attributes for a field, like a short flag, go in brackets between the help
/// string and the field name.
#[macro_export]
macro_rules! args {
    ($(#$argsmeta:tt)* $name:ident {
        $($fhelp:literal $([$($fextra:tt)*])? $fname:ident: $ftype:ty = $fdefault:expr;)*
    }) => {
        $crate::bin_common::args::args_helper::paste! {
            #[derive(clap::Args, Debug)]
            pub struct [<$name Cli>] {
                $(
                    #[arg(
                        long, $($($fextra)*,)?
                        default_value_t = ($fdefault), help = $fhelp
                    )]
                    $fname: $ftype,
                )*
            }

            $(#$argsmeta)*
            pub struct [<$name Args>] {
                $(
                    $fname: $ftype,
                )*
            }

            impl std::default::Default for [<$name Args>] {
                fn default() -> Self {
                    Self {
                        $(
                            $fname: $fdefault,
                        )*
                    }
                }
            }

            impl [<$name Args>] {
                $(
                    pub fn [<with_ $fname>](mut self, $fname: $ftype) -> Self {
                        self.$fname = $fname;
                        self
                    }

                    pub fn $fname(&self) -> &$ftype {
                        &self.$fname
                    }
                )*
            }

            impl [<$name Cli>] {
                pub fn to_args(&self) -> [<$name Args>] {
                    [<$name Args>] {
                        $(
                            $fname: self.$fname.clone(),
                        )*
                    }
                }
            }
        }
    };
}

pub use args;
pub use paste::paste;
