//! The command line table, one entry per supported (platform, profile).

use crate::{Commands, Platform, Profile};

const CL_TOOL: &str = "cl /nologo /wd4132 /wd4324 $in /link /out:$out";
const LINUX_TOOL: &str = "clang -o $out $in -lm";

pub(crate) fn commands(platform: Platform, profile: Profile) -> Option<Commands> {
    let commands = match (platform, profile) {
        (Platform::Linux, Profile::Debug) => Commands {
            compile: "clang -std=c11 -MMD -MT $out -MF $out.d -g -O0 -fcolor-diagnostics -fno-common -Wall -Werror -Wno-switch -DNDEBUG -DIMPLSTATIC= -DIMPLEXTERN=extern -pthread -I$root -I. -c $in -o $out",
            link: "clang -o $out $in -pthread -lm -ldl -g",
            tool: LINUX_TOOL,
            driver: "clang -Iembed -Wall -Wextra -Werror -ldl -lm -o $out $in",
        },
        (Platform::Linux, Profile::Release) => Commands {
            compile: "clang -std=c11 -MMD -MT $out -MF $out.d -g -Oz -fcolor-diagnostics -fno-common -Wall -Werror -Wno-switch -D_DEBUG -DIMPLSTATIC= -DIMPLEXTERN=extern -pthread -c -I$root -I. $in -o $out",
            link: "clang -o $out $in -pthread -lm -ldl -g",
            tool: LINUX_TOOL,
            driver: "clang -Iembed -Wall -Wextra -Werror -ldl -lm -Oz -o $out $in",
        },
        (Platform::Linux, Profile::Asan) => Commands {
            compile: "clang -std=c11 -MMD -MT $out -MF $out.d -g -O0 -fsanitize=address -fcolor-diagnostics -fno-common -Wall -Werror -Wno-switch -D_DEBUG -DIMPLSTATIC= -DIMPLEXTERN=extern -pthread -c -I$root -I. $in -o $out",
            link: "clang -fsanitize=address -o $out $in -pthread -lm -ldl -g",
            tool: LINUX_TOOL,
            driver: "clang -Iembed -Wall -Wextra -Werror -ldl -lm -fsanitize=address -o $out $in",
        },
        (Platform::Linux, Profile::Fuzz) => Commands {
            compile: "clang -fsanitize=fuzzer -std=c11 -MMD -MT $out -MF $out.d -g -O0 -fcolor-diagnostics -fno-common -Wall -Werror -Wno-switch -DNDEBUG -DIMPLSTATIC= -DIMPLEXTERN=extern -pthread -I$root -I. -c $in -o $out",
            link: "clang -fsanitize=fuzzer -o $out $in -pthread -lm -ldl -g",
            tool: LINUX_TOOL,
            driver: "clang -fsanitize=fuzzer -Iembed -Wall -Wextra -Werror -ldl -lm -o $out $in",
        },
        (Platform::Windows, Profile::Debug) => Commands {
            compile: "cl /showIncludes /nologo /FS /Od /Zi /D_DEBUG /DIMPLSTATIC= /DIMPLEXTERN=extern /D_CRT_SECURE_NO_DEPRECATE /W4 /WX /I$root /I. /c $in /Fo:$out /Fd:$out.pdb",
            link: "link /nologo gdi32.lib user32.lib onecore.lib /DEBUG $in /out:$out /pdb:$out.pdb",
            tool: CL_TOOL,
            driver: "cl /nologo /Zi /FS /D_CRT_SECURE_NO_WARNINGS /Iembed /W4 /Wall /WX $in /link /debug onecore.lib user32.lib /out:$out",
        },
        (Platform::Windows, Profile::Release) => Commands {
            compile: "cl /showIncludes /nologo /FS /Ox /GL /Zi /DNDEBUG /DIMPLSTATIC= /DIMPLEXTERN=extern /D_CRT_SECURE_NO_DEPRECATE /W4 /WX /I$root /I. /c $in /Fo$out /Fd:$out.pdb",
            link: "link /nologo gdi32.lib user32.lib onecore.lib /LTCG /DEBUG /OPT:REF /OPT:ICF $in /out:$out /pdb:$out.pdb",
            tool: CL_TOOL,
            driver: "cl /nologo /FS /D_CRT_SECURE_NO_WARNINGS /Iembed /W4 /Zi /Ox /GL /Wall /WX /wd4710 /wd4711 $in /link onecore.lib user32.lib /LTCG /DEBUG /out:$out",
        },
        (Platform::Windows, Profile::Asan) => Commands {
            compile: "cl /showIncludes /nologo /FS /Od /fsanitize=address /Zi /D_DEBUG /DIMPLSTATIC= /DIMPLEXTERN=extern /D_CRT_SECURE_NO_DEPRECATE /W4 /WX /I$root /I. /c $in /Fo:$out /Fd:$out.pdb",
            link: "link /nologo gdi32.lib user32.lib onecore.lib /DEBUG $in /out:$out /pdb:$out.pdb",
            tool: CL_TOOL,
            driver: "cl /nologo /FS /D_CRT_SECURE_NO_WARNINGS /Iembed /W4 /Wall /WX $in /link /DEBUG onecore.lib user32.lib /out:$out",
        },
        (Platform::Windows, Profile::Fuzz) => return None,
    };
    Some(commands)
}
