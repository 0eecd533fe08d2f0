//! Builtin file-type table and default directory excludes
//!
//! Data only. The table is registered through the same filter-spec parser
//! user definitions go through, so every entry here is expressed in the
//! `KIND:ARGS` grammar.

/// (type name, filter specs) for every builtin type
pub const DEFAULT_TYPES: &[(&str, &[&str])] = &[
    ("actionscript", &["ext:as,mxml"]),
    ("ada", &["ext:ada,adb,ads"]),
    ("asm", &["ext:asm,s,S"]),
    ("asp", &["ext:asp"]),
    ("aspx", &["ext:master,ascx,asmx,aspx,svc"]),
    ("autoconf", &["ext:ac,in"]),
    ("automake", &["ext:am,in"]),
    ("awk", &["ext:awk"]),
    ("batch", &["ext:bat,cmd"]),
    ("cc", &["ext:c,h,xs"]),
    ("cfmx", &["ext:cfc,cfm,cfml"]),
    ("clojure", &["ext:clj"]),
    (
        "cmake",
        &["is:CMakeLists.txt", "ext:cmake"],
    ),
    ("coffeescript", &["ext:coffee"]),
    (
        "cpp",
        &["ext:cpp,cc,cxx,m,hpp,hh,h,hxx"],
    ),
    ("csharp", &["ext:cs"]),
    ("css", &["ext:css"]),
    ("dart", &["ext:dart"]),
    ("delphi", &["ext:pas,int,dfm,nfm,dof,dpk,dproj,groupproj,bdsgroup,bdsproj"]),
    ("elisp", &["ext:el"]),
    ("elixir", &["ext:ex,exs"]),
    ("erlang", &["ext:erl,hrl"]),
    ("fortran", &["ext:f,f77,f90,f95,f03,for,ftn,fpp"]),
    ("go", &["ext:go"]),
    ("groovy", &["ext:groovy,gtmpl,gpp,grunit,gradle"]),
    ("haskell", &["ext:hs,lhs"]),
    ("hh", &["ext:h"]),
    ("html", &["ext:htm,html"]),
    ("java", &["ext:java,properties"]),
    ("js", &["ext:js"]),
    ("json", &["ext:json"]),
    ("jsp", &["ext:jsp,jspx,jhtm,jhtml"]),
    ("less", &["ext:less"]),
    ("lisp", &["ext:lisp,lsp"]),
    ("lua", &["ext:lua", r"firstlinematch:/^#!.*\blua(jit)?/"]),
    (
        "make",
        &["ext:mk,mak", "is:makefile,Makefile,GNUmakefile"],
    ),
    ("markdown", &["ext:md,markdown"]),
    ("matlab", &["ext:m"]),
    ("objc", &["ext:m,h"]),
    ("objcpp", &["ext:mm,h"]),
    ("ocaml", &["ext:ml,mli"]),
    ("parrot", &["ext:pir,pasm,pmc,ops,pod,pg,tg"]),
    (
        "perl",
        &["ext:pl,pm,pod,t,psgi", r"firstlinematch:/^#!.*\bperl/"],
    ),
    ("php", &["ext:php,phpt,php3,php4,php5,phtml", r"firstlinematch:/^#!.*\bphp/"]),
    ("plone", &["ext:pt,cpt,metadata,cpy,py"]),
    (
        "python",
        &["ext:py", r"firstlinematch:/^#!.*\bpython/"],
    ),
    ("rake", &["is:Rakefile"]),
    ("rr", &["ext:R"]),
    (
        "ruby",
        &[
            "ext:rb,rhtml,rjs,rxml,erb,rake,spec",
            "is:Rakefile",
            r"firstlinematch:/^#!.*\bruby/",
        ],
    ),
    ("rust", &["ext:rs"]),
    ("sass", &["ext:sass,scss"]),
    ("scala", &["ext:scala"]),
    ("scheme", &["ext:scm,ss"]),
    (
        "shell",
        &[
            "ext:sh,bash,csh,tcsh,ksh,zsh,fish",
            r"firstlinematch:/^#!.*\b(?:ba|t?c|k|z|fi)?sh\b/",
        ],
    ),
    ("smalltalk", &["ext:st"]),
    ("sql", &["ext:sql,ctl"]),
    ("swift", &["ext:swift"]),
    ("tcl", &["ext:tcl,itcl,itk"]),
    ("tex", &["ext:tex,cls,sty"]),
    ("tt", &["ext:tt,tt2,ttml"]),
    ("vb", &["ext:bas,cls,frm,ctl,vb,resx"]),
    ("verilog", &["ext:v,vh,sv"]),
    ("vhdl", &["ext:vhd,vhdl"]),
    ("vim", &["ext:vim"]),
    (
        "xml",
        &["ext:xml,dtd,xsl,xslt,ent", "firstlinematch:/<[?]xml/"],
    ),
    ("yaml", &["ext:yaml,yml"]),
];

/// Directory basenames pruned from traversal by default
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".bzr",
    ".deps",
    ".git",
    ".hg",
    ".libs",
    ".metadata",
    ".pc",
    ".svn",
    "CMakeFiles",
    "CVS",
    "RCS",
    "SCCS",
    "_build",
    "_darcs",
    "autom4te.cache",
    "blib",
    "node_modules",
];
